pub mod admin;
pub mod application;
pub mod clock;
pub mod connection;
pub mod control;
pub mod error;
pub mod message;
pub mod persister;
pub mod retransmission;
pub mod session;
pub mod session_id;
pub mod session_state;
pub mod settings;

pub mod acceptor;
pub mod initiator;

pub use application::{ApplicationHook, NullApplicationHook};
pub use connection::{Connection, Disconnected, WriteError};
pub use control::ControlFlags;
pub use error::{AcceptorError, SessionError};
pub use message::{Codec, DecodeError, Message, Metadata, UnknownType};
pub use persister::{Direction, InMemoryPersister, NullPersister, PersistedRecord, Persister};
pub use retransmission::{RetransmissionContext, RetransmissionState};
pub use session::{Role, SessionCore};
pub use session_id::{ParseSessionIdError, SessionId};
pub use session_state::{SequenceCursor, SessionState};
pub use settings::{LoginParameters, Settings, SessionSettings};
