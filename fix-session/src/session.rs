//! `SessionCore`: the ingress pipeline (`process`), the egress pipeline
//! (`send_process`), the heartbeat scheduler, and the logon/logout/resend
//! admin handlers that sit between them.

use std::time::Duration;

use fix_core::{FixString, MsgType, SeqNum, UtcTimestamp};
use tracing::{debug, error, instrument, warn};

use crate::admin::{self, SessionRejectReason};
use crate::application::ApplicationHook;
use crate::clock::{AtomicInstant, Clock};
use crate::connection::Connection;
use crate::control::ControlFlags;
use crate::error::SessionError;
use crate::message::{Codec, DecodeError, Message};
use crate::persister::{Direction, Persister};
use crate::retransmission::RetransmissionContext;
use crate::session_id::SessionId;
use crate::session_state::{SequenceCursor, SessionState};
use crate::settings::{LoginParameters, SessionSettings};

/// Which side of the handshake a session plays. An initiator sends the
/// first Logon; an acceptor waits for one and authenticates it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Initiator,
    Acceptor,
}

fn persist_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> SessionError {
    SessionError::Persist(Box::new(err))
}

/// What `enforce` decided about an inbound message before it reaches
/// dispatch.
#[derive(Debug)]
enum EnforceOutcome {
    /// `seqnum == next_receive_seq`; proceed to dispatch and advance.
    InSequence,
    /// `seqnum < next_receive_seq` with `PossDupFlag`; deliver but the
    /// receive cursor does not move.
    PossDup,
    /// Handled entirely inside `enforce` (compid mismatch, gap detected);
    /// the pipeline should return without dispatching.
    Handled,
}

/// The session state machine. Generic over its five external collaborators
/// so that production code can plug in a real codec/dictionary/transport/
/// store while tests use in-memory fakes.
pub struct SessionCore<Cd, Md, Ps, Ah, Cn> {
    sid: SessionId,
    role: Role,
    codec: Cd,
    #[allow(dead_code)]
    metadata: Md,
    persister: Ps,
    app: Ah,
    connection: Cn,
    settings: SessionSettings,
    login: LoginParameters,
    state: SessionState,
    cursor: SequenceCursor,
    clock: Clock,
    last_sent: AtomicInstant,
    last_received: AtomicInstant,
    state_entered: AtomicInstant,
    control: ControlFlags,
    /// Resend we are currently serving for the peer (outbound direction);
    /// at most one may be active, per invariant 4.
    serving_resend: Option<RetransmissionContext>,
    /// Inbound messages received while recovering from a gap on our
    /// receive side, buffered until the gap closes.
    queued: Vec<Message>,
    test_req_id: Option<FixString>,
    logon_retries: u32,
}

impl<Cd, Md, Ps, Ah, Cn> SessionCore<Cd, Md, Ps, Ah, Cn>
where
    Cd: Codec,
    Md: crate::message::Metadata,
    Ps: Persister,
    Ah: ApplicationHook,
    Cn: Connection,
{
    /// Recovers `next_send_seq`/`next_receive_seq` from `persister` before
    /// the session handles a single message, so a process restarted against
    /// the same store picks up mid-stream rather than renegotiating from 1.
    pub fn new(
        sid: SessionId,
        role: Role,
        codec: Cd,
        metadata: Md,
        mut persister: Ps,
        app: Ah,
        connection: Cn,
        settings: SessionSettings,
        login: LoginParameters,
    ) -> Result<SessionCore<Cd, Md, Ps, Ah, Cn>, SessionError> {
        let clock = Clock::new();
        let initial_state = match role {
            Role::Initiator => SessionState::NotLoggedIn,
            Role::Acceptor => SessionState::WaitForLogon,
        };
        let next_send = persister.get_cursor(Direction::Send).map_err(persist_err)?;
        let next_recv = persister.get_cursor(Direction::Recv).map_err(persist_err)?;
        let now = clock.now();
        Ok(SessionCore {
            sid,
            role,
            codec,
            metadata,
            persister,
            app,
            connection,
            settings,
            login,
            state: initial_state,
            cursor: SequenceCursor::with_start(next_send, next_recv),
            last_sent: AtomicInstant::default(),
            last_received: AtomicInstant::default(),
            state_entered: AtomicInstant::default(),
            clock,
            control: ControlFlags::new(),
            serving_resend: None,
            queued: Vec::new(),
            test_req_id: None,
            logon_retries: 0,
        }
        .with_now(now))
    }

    /// Writes both cursor directions back to `persister`. Called after every
    /// mutation of `cursor` so a crash leaves the store at most one message
    /// behind the in-memory state.
    fn persist_cursors(&mut self) -> Result<(), SessionError> {
        self.persister
            .put_cursor(Direction::Send, self.cursor.next_send_seq())
            .map_err(persist_err)?;
        self.persister
            .put_cursor(Direction::Recv, self.cursor.next_receive_seq())
            .map_err(persist_err)?;
        Ok(())
    }

    fn with_now(mut self, now: AtomicInstant) -> SessionCore<Cd, Md, Ps, Ah, Cn> {
        self.last_sent.set(&now);
        self.last_received.set(&now);
        self.state_entered.set(&now);
        self
    }

    pub fn sid(&self) -> &SessionId {
        &self.sid
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn control(&self) -> &ControlFlags {
        &self.control
    }

    pub fn cursor(&self) -> &SequenceCursor {
        &self.cursor
    }

    fn set_state(&mut self, state: SessionState) {
        debug!(session = %self.sid, from = %self.state, to = %state, "state transition");
        self.state = state;
        let now = self.clock.now();
        self.state_entered.set(&now);
    }

    /// Begins the logon protocol. Initiators send the first Logon here;
    /// acceptors simply sit in `wait_for_logon` until one arrives via
    /// `process`.
    #[instrument(level = "debug", skip_all, fields(session = %self.sid))]
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.role == Role::Initiator {
            let hbi = self.settings.heartbeat_interval_seconds as i32;
            let reset = self.settings.reset_on_logon || self.login.reset_sequence_numbers;
            if reset {
                self.cursor.reset();
                self.persist_cursors()?;
            }
            self.send_logon(hbi, reset).await?;
            self.set_state(SessionState::LogonSent);
        }
        Ok(())
    }

    /// Idempotent shutdown: attempts a graceful Logout if established, then
    /// forces `session_terminated`.
    pub async fn stop(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.control.set_shutdown();
        if self.state.is_established() {
            let _ = self.send_logout(None).await;
        }
        if self.settings.reset_on_disconnect {
            self.cursor.reset();
            let _ = self.persist_cursors();
        }
        self.set_state(SessionState::SessionTerminated);
    }

    // ---- ingress pipeline (§4.1) ----------------------------------------

    #[instrument(level = "trace", skip_all, fields(session = %self.sid), err)]
    pub async fn process(&mut self, raw_frame: &[u8]) -> Result<(), SessionError> {
        let message = match self.codec.decode(raw_frame) {
            Ok(message) => message,
            Err(DecodeError::Garbled(reason)) => {
                error!(%reason, "garbled frame, terminating session");
                self.stop().await;
                return Err(SessionError::Decode(DecodeError::Garbled(reason)));
            }
            Err(DecodeError::Reject { seqnum, reason }) => {
                self.generate_reject(
                    seqnum,
                    &MsgType::Application(FixString::new()),
                    SessionRejectReason::IncorrectDataFormatForValue,
                    None,
                    Some(&reason),
                )
                .await?;
                return Ok(());
            }
        };
        let now = self.clock.now();
        self.last_received.set(&now);
        self.ingest(message).await
    }

    async fn ingest(&mut self, message: Message) -> Result<(), SessionError> {
        match self.enforce(&message).await? {
            EnforceOutcome::Handled => Ok(()),
            EnforceOutcome::InSequence => {
                let seqnum = message.seqnum();
                let msg_type = message.msg_type().clone();
                let handled = self.dispatch(&message).await?;
                if handled {
                    if !matches!(msg_type, MsgType::SequenceReset) {
                        self.cursor.advance_receive();
                        self.persist_cursors()?;
                    }
                    self.drain_queue().await?;
                } else {
                    self.generate_reject(
                        seqnum,
                        &msg_type,
                        SessionRejectReason::Other,
                        None,
                        None,
                    )
                    .await?;
                }
                Ok(())
            }
            EnforceOutcome::PossDup => {
                self.dispatch(&message).await?;
                Ok(())
            }
        }
    }

    /// Replays buffered messages once the receive cursor catches up to
    /// them, closing the gap that put us in `resend_request_sent`.
    async fn drain_queue(&mut self) -> Result<(), SessionError> {
        loop {
            let next = self.cursor.next_receive_seq();
            let Some(pos) = self.queued.iter().position(|m| m.seqnum() == next) else {
                break;
            };
            let message = self.queued.remove(pos);
            let msg_type = message.msg_type().clone();
            let handled = self.dispatch(&message).await?;
            if !handled {
                break;
            }
            if !matches!(msg_type, MsgType::SequenceReset) {
                self.cursor.advance_receive();
                self.persist_cursors()?;
            }
        }
        if self.queued.is_empty() && matches!(self.state, SessionState::ResendRequestSent) {
            self.set_state(SessionState::Continuous);
        }
        Ok(())
    }

    async fn enforce(&mut self, message: &Message) -> Result<EnforceOutcome, SessionError> {
        if self.settings.check_comp_id {
            let sender_ok = message.header.sender_comp_id.as_utf8() == self.sid.target_comp_id();
            let target_ok = message.header.target_comp_id.as_utf8() == self.sid.sender_comp_id();
            if !sender_ok || !target_ok {
                warn!(session = %self.sid, "compid mismatch, logging out");
                let _ = self.send_logout(Some("compid mismatch")).await;
                self.set_state(SessionState::LogoffSent);
                return Err(SessionError::CompIdMismatch {
                    session: self.sid.clone(),
                });
            }
        }

        if self.settings.check_latency {
            let drift = UtcTimestamp::now() - message.header.sending_time;
            if drift.num_seconds().abs() > self.settings.max_latency_seconds as i64 {
                warn!(session = %self.sid, "sendingtime drift exceeds max_latency_seconds");
                self.generate_reject(
                    message.seqnum(),
                    message.msg_type(),
                    SessionRejectReason::SendingTimeAccuracyProblem,
                    None,
                    Some("SendingTime accuracy problem"),
                )
                .await?;
                return Ok(EnforceOutcome::Handled);
            }
        }

        if !self.state.is_established() && !matches!(message.msg_type(), MsgType::Logon) {
            return Err(SessionError::NotEstablished);
        }

        // ResetSeqNumFlag=Y resets both cursors to 1 atomically before any
        // further processing, so it must bypass the ordinary gap check
        // below rather than being judged against the pre-reset cursor.
        if matches!(message.msg_type(), MsgType::Logon)
            && message.field(admin::tags::RESET_SEQ_NUM_FLAG) == Some("Y")
        {
            return Ok(EnforceOutcome::InSequence);
        }

        let expected = self.cursor.next_receive_seq();
        let seqnum = message.seqnum();

        if seqnum == expected {
            return Ok(EnforceOutcome::InSequence);
        }

        if seqnum < expected {
            if message.poss_dup_flag() {
                return Ok(EnforceOutcome::PossDup);
            }
            error!(seqnum, expected, "sequence too low without PossDup, terminating");
            let _ = self.send_logout(Some("sequence too low")).await;
            self.stop().await;
            return Err(SessionError::SequenceTooLow {
                got: seqnum,
                expected,
            });
        }

        // seqnum > expected: gap.
        if matches!(self.state, SessionState::ResendRequestSent) {
            self.queued.push(message.clone());
            return Ok(EnforceOutcome::Handled);
        }
        warn!(seqnum, expected, "gap detected, requesting resend");
        self.queued.push(message.clone());
        self.send_resend_request(expected, 0).await?;
        self.set_state(SessionState::ResendRequestSent);
        Ok(EnforceOutcome::Handled)
    }

    async fn dispatch(&mut self, message: &Message) -> Result<bool, SessionError> {
        let msg_type = message.msg_type().clone();
        if msg_type.is_admin() {
            match &msg_type {
                MsgType::Logon => self.on_logon(message).await?,
                MsgType::Logout => self.on_logout(message).await?,
                MsgType::Heartbeat => self.on_heartbeat(message).await?,
                MsgType::TestRequest => self.on_test_request(message).await?,
                MsgType::ResendRequest => self.on_resend_request(message).await?,
                MsgType::SequenceReset => self.on_sequence_reset(message).await?,
                MsgType::Reject => self.on_reject(message).await?,
                MsgType::Application(_) => unreachable!("is_admin() implies not Application"),
            }
            self.app.on_admin(&msg_type, message);
            Ok(true)
        } else {
            Ok(self.app.on_application(message.seqnum(), message))
        }
    }

    // ---- admin handlers (§4.4, §4.5, §4.6) ------------------------------

    async fn on_logon(&mut self, message: &Message) -> Result<(), SessionError> {
        let reset_requested = message.field(admin::tags::RESET_SEQ_NUM_FLAG) == Some("Y");
        if reset_requested {
            self.cursor.reset();
            self.persist_cursors()?;
        }

        match self.role {
            Role::Acceptor => {
                if !self.app.authenticate(&self.sid, message) {
                    let _ = self.send_logout(Some("authentication failed")).await;
                    self.stop().await;
                    return Err(SessionError::AuthFailure {
                        session: self.sid.clone(),
                    });
                }
                let hbi = message
                    .field(admin::tags::HEART_BT_INT)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(self.settings.heartbeat_interval_seconds as i32);
                self.settings.heartbeat_interval_seconds = hbi as u32;
                self.send_logon(hbi, reset_requested).await?;
                self.set_state(SessionState::Continuous);
            }
            Role::Initiator => {
                if matches!(self.state, SessionState::LogonSent) {
                    self.logon_retries = 0;
                    self.set_state(SessionState::Continuous);
                }
            }
        }
        Ok(())
    }

    async fn on_logout(&mut self, _message: &Message) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::LogoffSent) {
            self.set_state(SessionState::SessionTerminated);
        } else {
            let _ = self.send_logout(None).await;
            self.set_state(SessionState::SessionTerminated);
        }
        if self.settings.reset_on_logout {
            self.cursor.reset();
            self.persist_cursors()?;
        }
        Ok(())
    }

    async fn on_heartbeat(&mut self, message: &Message) -> Result<(), SessionError> {
        if let Some(id) = message.field(admin::tags::TEST_REQ_ID) {
            let outstanding = self.test_req_id.as_ref().map(FixString::as_utf8);
            if outstanding == Some(id) {
                self.test_req_id = None;
                if matches!(self.state, SessionState::TestRequestSent) {
                    self.set_state(SessionState::Continuous);
                }
            }
        }
        Ok(())
    }

    async fn on_test_request(&mut self, message: &Message) -> Result<(), SessionError> {
        let id = message.field(admin::tags::TEST_REQ_ID).map(FixString::from);
        self.send_heartbeat(id.as_ref()).await
    }

    async fn on_resend_request(&mut self, message: &Message) -> Result<(), SessionError> {
        if self.serving_resend.is_some() {
            self.generate_reject(
                message.seqnum(),
                message.msg_type(),
                SessionRejectReason::Other,
                None,
                Some("a resend is already active for this direction"),
            )
            .await?;
            return Ok(());
        }

        let begin: SeqNum = message
            .field(admin::tags::BEGIN_SEQ_NO)
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        let requested_end: SeqNum = message
            .field(admin::tags::END_SEQ_NO)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let high_water = self.cursor.next_send_seq() - 1;
        let resolved_end = if requested_end == 0 {
            high_water
        } else {
            requested_end.min(high_water)
        };

        self.serving_resend = Some(RetransmissionContext::new(begin, requested_end, begin));
        let result = self
            .replay_range(begin, resolved_end, high_water, requested_end)
            .await;
        self.serving_resend = None;
        result
    }

    /// Scans persisted records in `[begin, resolved_end]`, re-emitting
    /// application messages with `PossDupFlag=Y` and coalescing admin
    /// messages (and any unpersisted holes) into `SequenceReset-GapFill`
    /// spans. Finishes with a terminal gap-fill if the request reached past
    /// our own high-water mark.
    async fn replay_range(
        &mut self,
        begin: SeqNum,
        resolved_end: SeqNum,
        high_water: SeqNum,
        requested_end: SeqNum,
    ) -> Result<(), SessionError> {
        let records = self
            .persister
            .get_range(begin, resolved_end)
            .map_err(persist_err)?;

        let mut gap_start: Option<SeqNum> = None;
        let mut cursor = begin;

        for record in records {
            if record.seqnum > cursor {
                gap_start.get_or_insert(cursor);
            }
            match self.codec.decode(&record.frame) {
                Ok(decoded) if decoded.msg_type().is_admin() => {
                    gap_start.get_or_insert(record.seqnum);
                }
                Ok(decoded) => {
                    if let Some(start) = gap_start.take() {
                        self.send_gap_fill(start, record.seqnum).await?;
                    }
                    self.replay_message(decoded, record.seqnum).await?;
                }
                Err(_) => {
                    gap_start.get_or_insert(record.seqnum);
                }
            }
            cursor = record.seqnum + 1;
            if let Some(ctx) = self.serving_resend.as_mut() {
                ctx.advance_to(record.seqnum);
            }
        }

        if let Some(start) = gap_start.take() {
            self.send_gap_fill(start, cursor).await?;
        }

        if requested_end == 0 || requested_end > high_water {
            self.send_gap_fill(high_water + 1, high_water + 1).await?;
        }

        if let Some(ctx) = self.serving_resend.as_mut() {
            ctx.mark_no_more_records();
        }
        Ok(())
    }

    /// Re-emits an already-persisted message verbatim except for
    /// `PossDupFlag`/`OrigSendingTime`/`MsgSeqNum`, which are patched to
    /// reflect that this is a replay, not a new send. Bypasses
    /// `send_process`: the message is already persisted and must not
    /// consume another slot of `next_send_seq`.
    async fn replay_message(&mut self, mut decoded: Message, seqnum: SeqNum) -> Result<(), SessionError> {
        decoded.header.poss_dup_flag = Some(true);
        decoded.header.orig_sending_time = Some(decoded.header.sending_time);
        decoded.header.msg_seq_num = seqnum;
        let frame = self.codec.encode(&decoded);
        self.connection
            .write(&frame)
            .await
            .map_err(|err| SessionError::Connection(Box::new(err)))?;
        let now = self.clock.now();
        self.last_sent.set(&now);
        Ok(())
    }

    async fn on_sequence_reset(&mut self, message: &Message) -> Result<(), SessionError> {
        let gap_fill = message.field(admin::tags::GAP_FILL_FLAG) == Some("Y");
        let new_seq_no: SeqNum = message
            .field(admin::tags::NEW_SEQ_NO)
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| self.cursor.next_receive_seq());

        if gap_fill {
            if new_seq_no > self.cursor.next_receive_seq() {
                self.cursor.set_next_receive_seq(new_seq_no);
                self.persist_cursors()?;
            }
        } else {
            self.cursor.set_next_receive_seq(new_seq_no);
            self.persist_cursors()?;
        }
        Ok(())
    }

    /// Observable without gating state transitions: a Reject is always
    /// reported to the application via `on_admin` (called by `dispatch`
    /// after this returns), never suppressed.
    async fn on_reject(&mut self, _message: &Message) -> Result<(), SessionError> {
        Ok(())
    }

    // ---- egress pipeline (§4.2) ------------------------------------------

    pub async fn send(&mut self, message: Message) -> Result<(), SessionError> {
        self.send_process(message, None, false).await
    }

    #[instrument(level = "trace", skip_all, fields(session = %self.sid), err)]
    async fn send_process(
        &mut self,
        mut message: Message,
        custom_seqnum: Option<SeqNum>,
        no_increment: bool,
    ) -> Result<(), SessionError> {
        self.app.modify_outbound(&mut message);

        let seqnum = match custom_seqnum {
            Some(seq) => seq,
            None => self.cursor.advance_send(no_increment),
        };
        message.header.begin_string = FixString::from(self.sid.begin_string());
        message.header.msg_seq_num = seqnum;
        message.header.sender_comp_id = FixString::from(self.sid.sender_comp_id());
        message.header.target_comp_id = FixString::from(self.sid.target_comp_id());
        message.header.sending_time = UtcTimestamp::now();

        let frame = self.codec.encode(&message);

        let is_gap_fill = matches!(message.header.msg_type, MsgType::SequenceReset)
            && message.field(admin::tags::GAP_FILL_FLAG) == Some("Y");
        if !is_gap_fill {
            self.persister.put(seqnum, &frame).map_err(persist_err)?;
        }

        if let Err(err) = self.connection.write(&frame).await {
            self.set_state(SessionState::SessionTerminated);
            return Err(SessionError::Connection(Box::new(err)));
        }

        if custom_seqnum.is_none() && !no_increment {
            self.persist_cursors()?;
        }
        let now = self.clock.now();
        self.last_sent.set(&now);
        Ok(())
    }

    async fn send_logon(&mut self, heart_bt_int: i32, reset: bool) -> Result<(), SessionError> {
        let msg = admin::logon(heart_bt_int, reset);
        self.send_process(msg, None, false).await
    }

    async fn send_logout(&mut self, text: Option<&str>) -> Result<(), SessionError> {
        let text = text.map(FixString::from);
        let msg = admin::logout(text.as_ref());
        self.send_process(msg, None, false).await
    }

    async fn send_heartbeat(&mut self, test_req_id: Option<&FixString>) -> Result<(), SessionError> {
        let msg = admin::heartbeat(test_req_id);
        self.send_process(msg, None, false).await
    }

    async fn send_test_request(&mut self, id: &FixString) -> Result<(), SessionError> {
        let msg = admin::test_request(id);
        self.send_process(msg, None, false).await
    }

    async fn send_resend_request(&mut self, begin: SeqNum, end: SeqNum) -> Result<(), SessionError> {
        let msg = admin::resend_request(begin, end);
        self.send_process(msg, None, false).await
    }

    async fn send_gap_fill(&mut self, begin: SeqNum, new_seq_no: SeqNum) -> Result<(), SessionError> {
        let msg = admin::sequence_reset(new_seq_no, true);
        self.send_process(msg, Some(begin), true).await
    }

    pub async fn generate_reject(
        &mut self,
        ref_seq_num: SeqNum,
        ref_msg_type: &MsgType,
        reason: SessionRejectReason,
        ref_tag_id: Option<u32>,
        text: Option<&str>,
    ) -> Result<(), SessionError> {
        let msg = admin::reject(ref_seq_num, ref_msg_type, reason, ref_tag_id, text);
        self.send_process(msg, None, false).await
    }

    // ---- heartbeat scheduler (§4.3) --------------------------------------

    #[instrument(level = "trace", skip_all, fields(session = %self.sid), err)]
    pub async fn heartbeat_service(&mut self) -> Result<(), SessionError> {
        if self.control.is_shutdown() && !self.state.is_terminal() {
            if !matches!(self.state, SessionState::LogoffSent) {
                let _ = self.send_logout(None).await;
                self.set_state(SessionState::LogoffSent);
            }
            return Ok(());
        }

        if matches!(self.role, Role::Acceptor)
            && matches!(self.state, SessionState::WaitForLogon)
            && self.clock.elapsed_since(&self.state_entered)
                >= Duration::from_secs(self.settings.logon_timeout_seconds as u64)
        {
            warn!(session = %self.sid, "no inbound logon within logon_timeout_seconds, terminating");
            self.stop().await;
            return Err(SessionError::LogonTimeout { retries: 0 });
        }

        let hbi = Duration::from_secs(self.settings.heartbeat_interval_seconds as u64);
        let grace = (hbi / 5).max(Duration::from_secs(1));

        if self.state.is_established() && self.clock.elapsed_since(&self.last_sent) >= hbi {
            self.send_heartbeat(None).await?;
        }

        if self.clock.elapsed_since(&self.last_received) >= hbi + grace
            && !matches!(self.state, SessionState::TestRequestSent)
        {
            let id = FixString::from(format!("TEST-{}", self.cursor.next_send_seq()));
            self.send_test_request(&id).await?;
            self.test_req_id = Some(id);
            self.set_state(SessionState::TestRequestSent);
        }

        if matches!(self.state, SessionState::TestRequestSent)
            && self.clock.elapsed_since(&self.last_received) >= hbi * 2
        {
            warn!(session = %self.sid, "peer unresponsive, terminating");
            self.stop().await;
            return Err(SessionError::DeadPeer);
        }

        if matches!(self.state, SessionState::LogonSent)
            && self.clock.elapsed_since(&self.state_entered)
                >= Duration::from_millis(self.login.retry_interval_ms)
        {
            if self.logon_retries >= self.login.max_retries {
                self.stop().await;
                return Err(SessionError::LogonTimeout {
                    retries: self.logon_retries,
                });
            }
            self.logon_retries += 1;
            let hbi = self.settings.heartbeat_interval_seconds as i32;
            let reset = self.login.reset_sequence_numbers;
            self.send_logon(hbi, reset).await?;
            self.set_state(SessionState::LogonSent);
        }

        Ok(())
    }

    /// Drives the session to completion: a single-task loop alternating
    /// between an inbound frame and a heartbeat tick, exactly the
    /// ingress-task/timer-task pairing described for this crate's
    /// concurrency model. Returns once the session reaches
    /// `session_terminated`.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let heartbeat_interval =
            Duration::from_secs(self.settings.heartbeat_interval_seconds.max(1) as u64);
        let mut tick = crate::clock::heartbeat_tick(heartbeat_interval);

        while !self.state.is_terminal() {
            tokio::select! {
                biased;

                _ = tick.tick() => {
                    if let Err(err) = self.heartbeat_service().await {
                        if err.is_fatal() || matches!(err, SessionError::DeadPeer) {
                            return Err(err);
                        }
                    }
                }
                frame = self.connection.read() => {
                    match frame {
                        Ok(frame) => {
                            if let Err(err) = self.process(&frame).await {
                                if err.is_fatal() {
                                    return Err(err);
                                }
                            }
                        }
                        Err(_disconnected) => {
                            self.stop().await;
                            return Err(SessionError::Connection(Box::new(
                                crate::connection::Disconnected,
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::application::NullApplicationHook;
    use crate::connection::test_support::ChannelConnection;
    use crate::message::{Metadata, UnknownType};
    use crate::persister::InMemoryPersister;

    /// A `Codec` that round-trips `Message` through a tiny private
    /// tag=value encoding, good enough for driving the state machine in
    /// tests without pulling in a real wire format.
    struct FakeCodec;

    impl Codec for FakeCodec {
        fn decode(&self, frame: &[u8]) -> Result<Message, DecodeError> {
            let text = std::str::from_utf8(frame)
                .map_err(|e| DecodeError::Garbled(e.to_string()))?;
            let mut parts = text.split('|');
            let msg_type = parts
                .next()
                .ok_or_else(|| DecodeError::Garbled("missing msg type".into()))?;
            let mut message = Message::new(MsgType::from_fix_str(msg_type));
            for kv in parts {
                if kv.is_empty() {
                    continue;
                }
                let (tag, value) = kv
                    .split_once('=')
                    .ok_or_else(|| DecodeError::Garbled("bad field".into()))?;
                let tag: fix_core::TagNum = tag
                    .parse()
                    .map_err(|_| DecodeError::Garbled("bad tag".into()))?;
                match tag {
                    34 => message.header.msg_seq_num = value.parse().unwrap_or(0),
                    49 => message.header.sender_comp_id = FixString::from(value),
                    56 => message.header.target_comp_id = FixString::from(value),
                    43 => message.header.poss_dup_flag = Some(value == "Y"),
                    _ => {
                        message.set_field(tag, value);
                    }
                }
            }
            Ok(message)
        }

        fn encode(&self, message: &Message) -> Vec<u8> {
            let mut out = format!(
                "{}|34={}|49={}|56={}",
                message.header.msg_type,
                message.header.msg_seq_num,
                message.header.sender_comp_id,
                message.header.target_comp_id,
            );
            if message.header.poss_dup_flag == Some(true) {
                out.push_str("|43=Y");
            }
            for (tag, value) in &message.fields {
                out.push_str(&format!("|{tag}={value}"));
            }
            out.into_bytes()
        }
    }

    struct FakeMetadata;

    impl Metadata for FakeMetadata {
        fn create(&self, msg_type: &MsgType) -> Result<Message, UnknownType> {
            Ok(Message::new(msg_type.clone()))
        }
    }

    type TestSession = SessionCore<FakeCodec, FakeMetadata, InMemoryPersister, NullApplicationHook, ChannelConnection>;

    fn new_session(role: Role) -> TestSession {
        let sid = SessionId::new("FIX.4.4", "US", "THEM");
        SessionCore::new(
            sid,
            role,
            FakeCodec,
            FakeMetadata,
            InMemoryPersister::new(),
            NullApplicationHook,
            ChannelConnection::new(),
            SessionSettings::default(),
            LoginParameters::default(),
        )
        .expect("fresh in-memory persister never fails cursor recovery")
    }

    #[tokio::test]
    async fn initiator_sends_logon_on_start() {
        let mut session = new_session(Role::Initiator);
        session.start().await.unwrap();
        assert_eq!(session.state(), SessionState::LogonSent);
        assert_eq!(session.connection.outbound.len(), 1);
        assert!(session.connection.outbound[0].starts_with(b"A|"));
    }

    #[tokio::test]
    async fn acceptor_completes_handshake_on_logon() {
        let mut session = new_session(Role::Acceptor);
        assert_eq!(session.state(), SessionState::WaitForLogon);
        session
            .process(b"A|34=1|49=THEM|56=US|108=30")
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Continuous);
        assert_eq!(session.cursor().next_receive_seq(), 2);
        assert_eq!(session.connection.outbound.len(), 1);
    }

    #[tokio::test]
    async fn compid_mismatch_logs_out_and_fails() {
        let mut session = new_session(Role::Acceptor);
        let err = session
            .process(b"A|34=1|49=WRONG|56=US|108=30")
            .await
            .unwrap_err();
        assert_matches!(err, SessionError::CompIdMismatch { .. });
        assert_eq!(session.state(), SessionState::LogoffSent);
    }

    #[tokio::test]
    async fn gap_triggers_resend_request_and_buffers_message() {
        let mut session = new_session(Role::Acceptor);
        session
            .process(b"A|34=1|49=THEM|56=US|108=30")
            .await
            .unwrap();

        session
            .process(b"D|34=3|49=THEM|56=US")
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::ResendRequestSent);
        assert_eq!(session.queued.len(), 1);
        let last = session.connection.outbound.last().unwrap();
        assert!(last.starts_with(b"2|"));
    }

    #[tokio::test]
    async fn sequence_too_low_without_possdup_terminates() {
        let mut session = new_session(Role::Acceptor);
        session
            .process(b"A|34=1|49=THEM|56=US|108=30")
            .await
            .unwrap();
        session
            .process(b"D|34=2|49=THEM|56=US")
            .await
            .unwrap();
        let err = session
            .process(b"D|34=1|49=THEM|56=US")
            .await
            .unwrap_err();
        assert_matches!(err, SessionError::SequenceTooLow { .. });
        assert_eq!(session.state(), SessionState::SessionTerminated);
    }

    #[tokio::test]
    async fn logout_in_continuous_replies_and_terminates() {
        let mut session = new_session(Role::Acceptor);
        session
            .process(b"A|34=1|49=THEM|56=US|108=30")
            .await
            .unwrap();
        session.process(b"5|34=2|49=THEM|56=US").await.unwrap();
        assert_eq!(session.state(), SessionState::SessionTerminated);
        assert_eq!(session.connection.outbound.len(), 2);
    }

    #[tokio::test]
    async fn resend_request_replays_persisted_application_messages() {
        let mut session = new_session(Role::Initiator);
        session.start().await.unwrap();
        session
            .process(b"A|34=1|49=THEM|56=US|108=30")
            .await
            .unwrap();
        session.send(Message::new(MsgType::Application("D".into()))).await.unwrap();
        session.send(Message::new(MsgType::Application("D".into()))).await.unwrap();

        session
            .process(b"2|34=2|49=THEM|56=US|7=2|16=0")
            .await
            .unwrap();

        let replayed = session
            .connection
            .outbound
            .iter()
            .filter(|frame| frame.starts_with(b"D|") && frame.windows(4).any(|w| w == b"43=Y"))
            .count();
        assert_eq!(replayed, 2);
    }
}
