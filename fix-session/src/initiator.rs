//! Thin entrypoint that brings a freshly-connected transport up through the
//! logon handshake as an initiator and runs the session to completion.
//!
//! Establishing the underlying transport (TCP connect, TLS handshake) is
//! outside this crate's scope; the caller hands in an already-connected
//! `Connection`.

use crate::application::ApplicationHook;
use crate::connection::Connection;
use crate::error::SessionError;
use crate::message::{Codec, Metadata};
use crate::persister::Persister;
use crate::session::{Role, SessionCore};
use crate::session_id::SessionId;
use crate::settings::{LoginParameters, SessionSettings};

#[allow(clippy::too_many_arguments)]
pub async fn connect<Cd, Md, Ps, Ah, Cn>(
    sid: SessionId,
    codec: Cd,
    metadata: Md,
    persister: Ps,
    app: Ah,
    connection: Cn,
    settings: SessionSettings,
    login: LoginParameters,
) -> Result<(), SessionError>
where
    Cd: Codec,
    Md: Metadata,
    Ps: Persister,
    Ah: ApplicationHook,
    Cn: Connection,
{
    let mut session = SessionCore::new(
        sid,
        Role::Initiator,
        codec,
        metadata,
        persister,
        app,
        connection,
        settings,
        login,
    )?;
    session.start().await?;
    session.run().await
}
