use log::{debug, info, warn};

use crate::engine::progress_index::{
    MAX_PROGRESS, ProgressIndex, ProgressRecord, WordId, WordUpdate, clamp_progress,
};
use crate::error::{NetworkError, StateError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn delta(self) -> i32 {
        match self {
            Direction::Up => 1,
            Direction::Down => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustRejected {
    AlreadyAdjusted,
    OutOfRange,
    NotOpen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    Close,
    Backdrop,
    /// Close and hand the word to the translation dialog.
    Edit,
}

/// Local state of one opened word. Viewing counts as an event, so the count
/// starts one above the server's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordDetailSession {
    pub word_id: WordId,
    pub word: String,
    pub translation: String,
    pub baseline_progress: u8,
    pub local_progress: u8,
    pub local_count: u32,
    pub progress_changed: bool,
    pub highlight_disabled: bool,
    baseline_highlight_disabled: bool,
}

impl WordDetailSession {
    pub fn open(record: &ProgressRecord) -> Self {
        let progress = record.progress.min(MAX_PROGRESS);
        Self {
            word_id: record.id,
            word: record.word.clone(),
            translation: record.translation.clone(),
            baseline_progress: progress,
            local_progress: progress,
            local_count: record.count.saturating_add(1),
            progress_changed: false,
            highlight_disabled: record.highlight_disabled,
            baseline_highlight_disabled: record.highlight_disabled,
        }
    }

    /// Move progress one step. Allowed once per session and only inside
    /// `0..=MAX_PROGRESS`; a rejected attempt changes nothing.
    pub fn adjust(&mut self, direction: Direction) -> Result<u8, AdjustRejected> {
        if self.progress_changed {
            return Err(AdjustRejected::AlreadyAdjusted);
        }
        let target = self.local_progress as i32 + direction.delta();
        if target < 0 || target > MAX_PROGRESS as i32 {
            return Err(AdjustRejected::OutOfRange);
        }
        self.local_progress = clamp_progress(target);
        self.local_count = self.local_count.saturating_add(1);
        self.progress_changed = true;
        Ok(self.local_progress)
    }

    pub fn toggle_highlight(&mut self) {
        self.highlight_disabled = !self.highlight_disabled;
    }

    /// What to send on close: the count always, progress and the highlight
    /// flag only when they changed.
    pub fn commit_update(&self) -> WordUpdate {
        WordUpdate {
            id: self.word_id,
            count: Some(self.local_count),
            progress: self
                .progress_changed
                .then(|| clamp_progress(self.local_progress as i32)),
            highlight_disabled: (self.highlight_disabled != self.baseline_highlight_disabled)
                .then_some(self.highlight_disabled),
        }
    }
}

/// Fold a confirmed update into the index. Only the submitted fields and the
/// server's progress are taken from the reply, so a sparse reply cannot blank
/// the cached translation.
fn apply_confirmed(index: &mut ProgressIndex, update: &WordUpdate, reply: &ProgressRecord) {
    if reply.id != update.id {
        warn!("update for word {} answered for word {}", update.id, reply.id);
    }
    let confirmed = WordUpdate {
        id: update.id,
        count: update.count,
        progress: Some(reply.progress),
        highlight_disabled: update.highlight_disabled,
    };
    if !index.apply(&confirmed) {
        debug!("word {} left the index before its update was confirmed", update.id);
    }
}

/// When a commit reaches the Progress Index.
pub trait CommitPolicy: Send {
    /// Called as the session closes, before the update is sent.
    fn before_submit(&self, index: &mut ProgressIndex, update: &WordUpdate);
    /// Called with the backend's answer.
    fn on_result(
        &self,
        index: &mut ProgressIndex,
        update: &WordUpdate,
        result: Result<ProgressRecord, NetworkError>,
    );
}

/// Apply locally right away, send once, never roll back.
#[derive(Clone, Copy, Debug, Default)]
pub struct FireAndForget;

impl CommitPolicy for FireAndForget {
    fn before_submit(&self, index: &mut ProgressIndex, update: &WordUpdate) {
        index.apply(update);
    }

    fn on_result(
        &self,
        index: &mut ProgressIndex,
        update: &WordUpdate,
        result: Result<ProgressRecord, NetworkError>,
    ) {
        match result {
            Ok(record) => apply_confirmed(index, update, &record),
            Err(e) => warn!("update for word {} was not saved: {e}", update.id),
        }
    }
}

/// Leave the index alone until the backend confirms.
#[derive(Clone, Copy, Debug, Default)]
pub struct AwaitConfirmation;

impl CommitPolicy for AwaitConfirmation {
    fn before_submit(&self, _index: &mut ProgressIndex, _update: &WordUpdate) {}

    fn on_result(
        &self,
        index: &mut ProgressIndex,
        update: &WordUpdate,
        result: Result<ProgressRecord, NetworkError>,
    ) {
        match result {
            Ok(record) => apply_confirmed(index, update, &record),
            Err(e) => warn!("update for word {} was rejected: {e}", update.id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetailState {
    Closed,
    Loading { word_id: WordId },
    Open(WordDetailSession),
    Failed { word_id: WordId, error: NetworkError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    /// The word is not cached; fetch it and call `receive_word`.
    Fetch(WordId),
}

/// What `close` produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosedDetail {
    pub update: WordUpdate,
    pub reason: CloseReason,
    pub word: String,
}

/// The word detail lifecycle: open, optionally adjust once, commit on close.
pub struct WordDetailFlow {
    state: DetailState,
    policy: Box<dyn CommitPolicy>,
}

impl std::fmt::Debug for WordDetailFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordDetailFlow")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Default for WordDetailFlow {
    fn default() -> Self {
        Self::new(Box::new(FireAndForget))
    }
}

impl WordDetailFlow {
    pub fn new(policy: Box<dyn CommitPolicy>) -> Self {
        Self {
            state: DetailState::Closed,
            policy,
        }
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, DetailState::Closed)
    }

    pub fn session(&self) -> Option<&WordDetailSession> {
        match &self.state {
            DetailState::Open(session) => Some(session),
            _ => None,
        }
    }

    pub fn open(
        &mut self,
        word_id: Option<WordId>,
        index: &ProgressIndex,
    ) -> Result<OpenOutcome, StateError> {
        let word_id = word_id.ok_or(StateError::MissingWordId)?;
        match index.get(word_id) {
            Some(record) => {
                debug!("opening word {word_id} from cache");
                self.state = DetailState::Open(WordDetailSession::open(record));
                Ok(OpenOutcome::Opened)
            }
            None => {
                debug!("word {word_id} not cached, fetching");
                self.state = DetailState::Loading { word_id };
                Ok(OpenOutcome::Fetch(word_id))
            }
        }
    }

    /// Answer to a fetch-by-id. Ignored unless that word is still loading.
    pub fn receive_word(
        &mut self,
        word_id: WordId,
        result: Result<ProgressRecord, NetworkError>,
        index: &mut ProgressIndex,
    ) -> bool {
        if self.state != (DetailState::Loading { word_id }) {
            debug!("dropping fetched word {word_id}, detail moved on");
            if let Ok(record) = result {
                index.upsert(record);
            }
            return false;
        }
        self.state = match result {
            Ok(record) => {
                let session = WordDetailSession::open(&record);
                index.upsert(record);
                DetailState::Open(session)
            }
            Err(error) => {
                warn!("loading word {word_id} failed: {error}");
                DetailState::Failed { word_id, error }
            }
        };
        true
    }

    pub fn adjust(&mut self, direction: Direction) -> Result<u8, AdjustRejected> {
        match &mut self.state {
            DetailState::Open(session) => session.adjust(direction),
            _ => Err(AdjustRejected::NotOpen),
        }
    }

    pub fn toggle_highlight(&mut self) -> Result<bool, StateError> {
        match &mut self.state {
            DetailState::Open(session) => {
                session.toggle_highlight();
                Ok(session.highlight_disabled)
            }
            _ => Err(StateError::NoOpenSession),
        }
    }

    /// Close the detail. An open session yields the update to submit, which
    /// has already passed through the commit policy. The detail closes no
    /// matter what happens to that update afterwards.
    pub fn close(&mut self, reason: CloseReason, index: &mut ProgressIndex) -> Option<ClosedDetail> {
        match std::mem::replace(&mut self.state, DetailState::Closed) {
            DetailState::Open(session) => {
                let update = session.commit_update();
                info!(
                    "closing word {} ({reason:?}): count={:?} progress={:?}",
                    update.id, update.count, update.progress
                );
                self.policy.before_submit(index, &update);
                Some(ClosedDetail {
                    update,
                    reason,
                    word: session.word,
                })
            }
            _ => None,
        }
    }

    pub fn on_commit_result(
        &self,
        index: &mut ProgressIndex,
        update: &WordUpdate,
        result: Result<ProgressRecord, NetworkError>,
    ) {
        self.policy.on_result(index, update, result);
    }

    /// Delete the open (or failed-to-load) word. Closes immediately without
    /// committing and returns the id to delete.
    pub fn delete(&mut self) -> Result<WordId, StateError> {
        let word_id = match &self.state {
            DetailState::Open(session) => session.word_id,
            DetailState::Loading { word_id } | DetailState::Failed { word_id, .. } => *word_id,
            DetailState::Closed => return Err(StateError::NoOpenSession),
        };
        self.state = DetailState::Closed;
        Ok(word_id)
    }
}

/// Apply a delete answer to the index. On success the record is gone.
pub fn reconcile_delete(
    index: &mut ProgressIndex,
    word_id: WordId,
    result: Result<WordId, NetworkError>,
) -> Result<WordId, NetworkError> {
    match result {
        Ok(deleted) => {
            if deleted != word_id {
                warn!("backend deleted word {deleted}, expected {word_id}");
            }
            index.remove(word_id);
            Ok(word_id)
        }
        Err(e) => {
            warn!("deleting word {word_id} failed: {e}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(progress: u8, count: u32) -> ProgressRecord {
        ProgressRecord {
            id: 4,
            word: "Baum".to_string(),
            progress,
            highlight_disabled: false,
            count,
            translation: "tree".to_string(),
        }
    }

    #[test]
    fn test_open_counts_the_view() {
        let session = WordDetailSession::open(&record(3, 5));
        assert_eq!(session.local_count, 6);
        assert_eq!(session.local_progress, 3);
        assert!(!session.progress_changed);
    }

    #[test]
    fn test_close_without_adjusting_submits_count_only() {
        let session = WordDetailSession::open(&record(3, 5));
        let update = session.commit_update();
        assert_eq!(
            update,
            WordUpdate {
                id: 4,
                count: Some(6),
                progress: None,
                highlight_disabled: None,
            }
        );
    }

    #[test]
    fn test_adjust_then_close_submits_progress() {
        let mut session = WordDetailSession::open(&record(3, 5));
        assert_eq!(session.adjust(Direction::Up), Ok(4));
        let update = session.commit_update();
        assert_eq!(update.count, Some(7));
        assert_eq!(update.progress, Some(4));
    }

    #[test]
    fn test_second_adjustment_is_a_no_op() {
        let mut session = WordDetailSession::open(&record(3, 5));
        session.adjust(Direction::Down).unwrap();
        let before = session.clone();
        assert_eq!(
            session.adjust(Direction::Up),
            Err(AdjustRejected::AlreadyAdjusted)
        );
        assert_eq!(session, before);
    }

    #[test]
    fn test_adjust_outside_range_is_rejected() {
        let mut low = WordDetailSession::open(&record(0, 0));
        let before = low.clone();
        assert_eq!(low.adjust(Direction::Down), Err(AdjustRejected::OutOfRange));
        assert_eq!(low, before);

        let mut high = WordDetailSession::open(&record(MAX_PROGRESS, 0));
        assert_eq!(high.adjust(Direction::Up), Err(AdjustRejected::OutOfRange));
        // A rejected attempt does not use up the one adjustment.
        assert_eq!(high.adjust(Direction::Down), Ok(MAX_PROGRESS - 1));
    }

    #[test]
    fn test_toggle_highlight_is_submitted_only_when_changed() {
        let mut session = WordDetailSession::open(&record(3, 0));
        session.toggle_highlight();
        assert_eq!(session.commit_update().highlight_disabled, Some(true));
        session.toggle_highlight();
        assert_eq!(session.commit_update().highlight_disabled, None);
    }

    #[test]
    fn test_flow_opens_cached_word() {
        let index = ProgressIndex::from_records([record(2, 1)]);
        let mut flow = WordDetailFlow::default();
        assert_eq!(flow.open(Some(4), &index), Ok(OpenOutcome::Opened));
        assert_eq!(flow.session().unwrap().local_count, 2);
    }

    #[test]
    fn test_flow_open_without_id_is_a_no_op() {
        let index = ProgressIndex::default();
        let mut flow = WordDetailFlow::default();
        assert_eq!(flow.open(None, &index), Err(StateError::MissingWordId));
        assert!(flow.is_closed());
    }

    #[test]
    fn test_flow_fetches_uncached_word() {
        let mut index = ProgressIndex::default();
        let mut flow = WordDetailFlow::default();
        assert_eq!(flow.open(Some(4), &index), Ok(OpenOutcome::Fetch(4)));
        assert_eq!(flow.state(), &DetailState::Loading { word_id: 4 });

        assert!(flow.receive_word(4, Ok(record(6, 2)), &mut index));
        assert_eq!(flow.session().unwrap().local_count, 3);
        assert!(index.get(4).is_some());
    }

    #[test]
    fn test_flow_fetch_failure_is_shown_inline() {
        let mut index = ProgressIndex::default();
        let mut flow = WordDetailFlow::default();
        flow.open(Some(4), &index).unwrap();
        let err = NetworkError::Status {
            status: 404,
            message: "not found".to_string(),
        };
        flow.receive_word(4, Err(err.clone()), &mut index);
        assert_eq!(
            flow.state(),
            &DetailState::Failed {
                word_id: 4,
                error: err
            }
        );
        assert!(flow.close(CloseReason::Close, &mut index).is_none());
        assert!(flow.is_closed());
    }

    #[test]
    fn test_flow_ignores_late_fetch() {
        let mut index = ProgressIndex::default();
        let mut flow = WordDetailFlow::default();
        flow.open(Some(4), &index).unwrap();
        flow.close(CloseReason::Backdrop, &mut index);
        assert!(!flow.receive_word(4, Ok(record(6, 2)), &mut index));
        assert!(flow.is_closed());
    }

    #[test]
    fn test_fire_and_forget_applies_on_close() {
        let mut index = ProgressIndex::from_records([record(3, 5)]);
        let mut flow = WordDetailFlow::new(Box::new(FireAndForget));
        flow.open(Some(4), &index).unwrap();
        flow.adjust(Direction::Up).unwrap();
        let closed = flow.close(CloseReason::Close, &mut index).unwrap();
        assert_eq!(closed.update.count, Some(7));
        assert_eq!(index.get(4).unwrap().progress, 4);
        assert_eq!(index.get(4).unwrap().count, 7);

        // A failed submit leaves the optimistic state in place.
        flow.on_commit_result(
            &mut index,
            &closed.update,
            Err(NetworkError::Transport("offline".to_string())),
        );
        assert_eq!(index.get(4).unwrap().progress, 4);
        assert!(flow.is_closed());
    }

    #[test]
    fn test_await_confirmation_applies_on_result() {
        let mut index = ProgressIndex::from_records([record(3, 5)]);
        let mut flow = WordDetailFlow::new(Box::new(AwaitConfirmation));
        flow.open(Some(4), &index).unwrap();
        flow.adjust(Direction::Up).unwrap();
        let closed = flow.close(CloseReason::Close, &mut index).unwrap();
        assert_eq!(index.get(4).unwrap().progress, 3);

        let mut confirmed = record(4, 7);
        confirmed.id = closed.update.id;
        flow.on_commit_result(&mut index, &closed.update, Ok(confirmed));
        assert_eq!(index.get(4).unwrap().progress, 4);
    }

    #[test]
    fn test_confirmed_reply_keeps_cached_fields() {
        let mut index = ProgressIndex::from_records([record(3, 5)]);
        let mut flow = WordDetailFlow::new(Box::new(AwaitConfirmation));
        flow.open(Some(4), &index).unwrap();
        flow.adjust(Direction::Up).unwrap();
        let closed = flow.close(CloseReason::Close, &mut index).unwrap();

        // A PATCH reply that only echoes id, word and progress.
        let sparse = ProgressRecord {
            id: 4,
            word: "Baum".to_string(),
            progress: 4,
            highlight_disabled: false,
            count: 0,
            translation: String::new(),
        };
        flow.on_commit_result(&mut index, &closed.update, Ok(sparse));

        let cached = index.get(4).unwrap();
        assert_eq!(cached.translation, "tree");
        assert_eq!(cached.count, 7);
        assert_eq!(cached.progress, 4);
    }

    #[test]
    fn test_confirmation_does_not_revive_deleted_word() {
        let mut index = ProgressIndex::from_records([record(3, 5)]);
        let mut flow = WordDetailFlow::default();
        flow.open(Some(4), &index).unwrap();
        let closed = flow.close(CloseReason::Close, &mut index).unwrap();
        index.remove(4);

        flow.on_commit_result(&mut index, &closed.update, Ok(record(3, 6)));
        assert!(index.get(4).is_none());
    }

    #[test]
    fn test_delete_closes_and_reconciles() {
        let mut index = ProgressIndex::from_records([record(3, 5)]);
        let mut flow = WordDetailFlow::default();
        flow.open(Some(4), &index).unwrap();
        assert_eq!(flow.delete(), Ok(4));
        assert!(flow.is_closed());
        assert_eq!(flow.delete(), Err(StateError::NoOpenSession));

        assert!(reconcile_delete(&mut index, 4, Err(NetworkError::Transport("x".into()))).is_err());
        assert!(index.get(4).is_some());
        assert_eq!(reconcile_delete(&mut index, 4, Ok(4)), Ok(4));
        assert!(index.get(4).is_none());
    }
}
