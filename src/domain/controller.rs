use super::{AnalysisRequest, AnalysisResult, FileId};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AnalysisState {
    Idle,
    Loading { seq: u64 },
    Done(AnalysisResult),
}

/// One outbound analysis call. The sequence number travels with the call
/// and comes back with its result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnalysisTicket {
    pub seq: u64,
    pub request: AnalysisRequest,
}

/// Lifecycle of the analysis panel: `Idle -> Loading -> Done`, and
/// `Done -> Loading` on every new request. There is no way to abort a
/// call in flight, so supersession works by discarding results whose
/// sequence number is no longer the one being waited for.
#[derive(Clone, Debug)]
pub struct AnalysisController {
    state: AnalysisState,
    next_seq: u64,
    last_request: Option<AnalysisRequest>,
    configured: Option<bool>,
}

impl Default for AnalysisController {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisController {
    pub fn new() -> Self {
        Self {
            state: AnalysisState::Idle,
            next_seq: 0,
            last_request: None,
            configured: None,
        }
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            AnalysisState::Done(result) => Some(result),
            _ => None,
        }
    }

    pub fn last_request(&self) -> Option<&AnalysisRequest> {
        self.last_request.as_ref()
    }

    /// Whether the backend reported credentials; only used for messaging.
    pub fn configured(&self) -> Option<bool> {
        self.configured
    }

    pub fn set_configured(&mut self, configured: Option<bool>) {
        self.configured = configured;
    }

    pub fn submit(&mut self, request: AnalysisRequest) -> Option<AnalysisTicket> {
        if request.text.trim().is_empty() {
            return None;
        }

        self.next_seq = self.next_seq.wrapping_add(1);
        let seq = self.next_seq;
        self.state = AnalysisState::Loading { seq };
        self.last_request = Some(request.clone());
        Some(AnalysisTicket { seq, request })
    }

    pub fn ask_suggested(
        &mut self,
        text: &str,
        file_id: FileId,
        suggestion: &str,
    ) -> Option<AnalysisTicket> {
        let suggestion = suggestion.trim();
        self.submit(AnalysisRequest {
            text: text.to_string(),
            file_id,
            issue_description: (!suggestion.is_empty()).then(|| suggestion.to_string()),
        })
    }

    /// Submits `question` about `text`. The question buffer is cleared only
    /// when the request was actually accepted.
    pub fn ask_custom(
        &mut self,
        text: &str,
        file_id: FileId,
        question: &mut String,
    ) -> Option<AnalysisTicket> {
        let trimmed = question.trim();
        if trimmed.is_empty() {
            return None;
        }
        let ticket = self.submit(AnalysisRequest {
            text: text.to_string(),
            file_id,
            issue_description: Some(trimmed.to_string()),
        })?;
        question.clear();
        Some(ticket)
    }

    pub fn retry(&mut self) -> Option<AnalysisTicket> {
        let request = self.last_request.clone()?;
        self.submit(request)
    }

    /// Applies the result for `seq`. Returns `false` if it was discarded
    /// because a newer request superseded it or the panel was closed.
    pub fn apply(&mut self, seq: u64, result: AnalysisResult) -> bool {
        match self.state {
            AnalysisState::Loading { seq: waiting } if waiting == seq => {
                self.state = AnalysisState::Done(result);
                true
            }
            _ => false,
        }
    }

    pub fn close(&mut self) {
        self.state = AnalysisState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisPayload, GENERIC_FAILURE_MESSAGE};

    fn request(text: &str) -> AnalysisRequest {
        AnalysisRequest {
            text: text.to_string(),
            file_id: FileId(7),
            issue_description: None,
        }
    }

    fn narrative(text: &str) -> AnalysisResult {
        AnalysisResult::Success {
            payload: AnalysisPayload::Narrative(text.to_string()),
        }
    }

    #[test]
    fn blank_text_is_silently_skipped() {
        let mut controller = AnalysisController::new();
        assert!(controller.submit(request("   \n")).is_none());
        assert_eq!(controller.state(), &AnalysisState::Idle);
    }

    #[test]
    fn submit_clears_previous_result_immediately() {
        let mut controller = AnalysisController::new();
        let first = controller.submit(request("db timeout at 10:02")).expect("ticket");
        assert!(controller.apply(first.seq, narrative("first")));
        assert!(controller.result().is_some());

        let second = controller.submit(request("db timeout at 10:03")).expect("ticket");
        assert!(controller.result().is_none());
        assert_eq!(controller.state(), &AnalysisState::Loading { seq: second.seq });
    }

    #[test]
    fn late_response_from_superseded_request_is_discarded() {
        let mut controller = AnalysisController::new();
        let a = controller.submit(request("request A text")).expect("A");
        let b = controller.submit(request("request B text")).expect("B");

        assert!(controller.apply(b.seq, narrative("B")));
        assert!(!controller.apply(a.seq, narrative("A")));
        assert_eq!(controller.result(), Some(&narrative("B")));
    }

    #[test]
    fn early_response_from_superseded_request_is_discarded() {
        let mut controller = AnalysisController::new();
        let a = controller.submit(request("request A text")).expect("A");
        let b = controller.submit(request("request B text")).expect("B");

        assert!(!controller.apply(a.seq, narrative("A")));
        assert!(matches!(controller.state(), AnalysisState::Loading { .. }));
        assert!(controller.apply(b.seq, narrative("B")));
        assert_eq!(controller.result(), Some(&narrative("B")));
    }

    #[test]
    fn transport_failure_reaches_terminal_state() {
        let mut controller = AnalysisController::new();
        let ticket = controller.submit(request("db timeout at 10:02")).expect("ticket");
        assert!(controller.apply(ticket.seq, AnalysisResult::failure(None)));
        assert!(!matches!(controller.state(), AnalysisState::Loading { .. }));
        assert_eq!(
            controller.result(),
            Some(&AnalysisResult::Failure {
                error_message: GENERIC_FAILURE_MESSAGE.to_string()
            })
        );
    }

    #[test]
    fn close_returns_to_idle_and_drops_in_flight_result() {
        let mut controller = AnalysisController::new();
        let ticket = controller.submit(request("db timeout at 10:02")).expect("ticket");
        controller.close();
        assert!(!controller.apply(ticket.seq, narrative("late")));
        assert_eq!(controller.state(), &AnalysisState::Idle);
    }

    #[test]
    fn ask_suggested_sets_issue_description() {
        let mut controller = AnalysisController::new();
        let ticket = controller
            .ask_suggested("db timeout at 10:02", FileId(7), " Investigate 3 error(s) ")
            .expect("ticket");
        assert_eq!(
            ticket.request.issue_description.as_deref(),
            Some("Investigate 3 error(s)")
        );
    }

    #[test]
    fn ask_custom_clears_question_only_when_accepted() {
        let mut controller = AnalysisController::new();

        let mut blank = "   ".to_string();
        assert!(controller.ask_custom("db timeout at 10:02", FileId(7), &mut blank).is_none());
        assert_eq!(blank, "   ");

        let mut question = "why is the pool exhausted?".to_string();
        assert!(controller.ask_custom("", FileId(7), &mut question).is_none());
        assert_eq!(question, "why is the pool exhausted?");

        let ticket = controller
            .ask_custom("db timeout at 10:02", FileId(7), &mut question)
            .expect("ticket");
        assert!(question.is_empty());
        assert_eq!(
            ticket.request.issue_description.as_deref(),
            Some("why is the pool exhausted?")
        );
    }

    #[test]
    fn retry_resubmits_last_request_with_new_sequence() {
        let mut controller = AnalysisController::new();
        assert!(controller.retry().is_none());
        let first = controller.submit(request("db timeout at 10:02")).expect("ticket");
        controller.apply(first.seq, AnalysisResult::failure(Some("boom")));
        let again = controller.retry().expect("retry");
        assert!(again.seq > first.seq);
        assert_eq!(again.request, first.request);
    }
}
