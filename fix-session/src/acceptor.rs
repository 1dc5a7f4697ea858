//! Thin entrypoint that waits for an inbound Logon on an already-accepted
//! transport and runs the session to completion.
//!
//! Listening for and accepting transport connections (TCP bind/accept, TLS
//! negotiation) is outside this crate's scope; the caller hands in an
//! already-accepted `Connection`.

use crate::application::ApplicationHook;
use crate::connection::Connection;
use crate::error::AcceptorError;
use crate::message::{Codec, Metadata};
use crate::persister::Persister;
use crate::session::{Role, SessionCore};
use crate::session_id::SessionId;
use crate::settings::{LoginParameters, SessionSettings};

#[allow(clippy::too_many_arguments)]
pub async fn accept<Cd, Md, Ps, Ah, Cn>(
    sid: SessionId,
    codec: Cd,
    metadata: Md,
    persister: Ps,
    app: Ah,
    connection: Cn,
    settings: SessionSettings,
    login: LoginParameters,
) -> Result<(), AcceptorError>
where
    Cd: Codec,
    Md: Metadata,
    Ps: Persister,
    Ah: ApplicationHook,
    Cn: Connection,
{
    let mut session = SessionCore::new(
        sid,
        Role::Acceptor,
        codec,
        metadata,
        persister,
        app,
        connection,
        settings,
        login,
    )?;
    session.run().await?;
    Ok(())
}

/// Looks a configured session up by [`SessionId`] before accepting, the way
/// a listener fronting several sessions behind one socket would. Returns
/// [`AcceptorError::UnknownSession`] if `lookup` has nothing for `sid`.
#[allow(clippy::too_many_arguments)]
pub async fn accept_known<Cd, Md, Ps, Ah, Cn>(
    sid: SessionId,
    lookup: impl FnOnce(&SessionId) -> Option<(SessionSettings, LoginParameters)>,
    codec: Cd,
    metadata: Md,
    persister: Ps,
    app: Ah,
    connection: Cn,
) -> Result<(), AcceptorError>
where
    Cd: Codec,
    Md: Metadata,
    Ps: Persister,
    Ah: ApplicationHook,
    Cn: Connection,
{
    let (settings, login) = lookup(&sid).ok_or(AcceptorError::UnknownSession)?;
    accept(sid, codec, metadata, persister, app, connection, settings, login).await
}
