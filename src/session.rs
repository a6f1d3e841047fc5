use std::ops::{Deref, DerefMut};

use tracing::{info, warn};

use crate::hypervisor::{ApiError, Credentials, Hypervisor};

/// An open management session.
///
/// Dereferences to the underlying [`Hypervisor`]. The session is closed
/// exactly once: by [`Session::close`] on the happy path, or on drop when an
/// earlier step bailed out with `?`.
pub struct Session<'a, H: Hypervisor> {
    api: &'a mut H,
    host: String,
    open: bool,
}

impl<'a, H: Hypervisor> Session<'a, H> {
    pub fn open(api: &'a mut H, credentials: &Credentials) -> Result<Self, ApiError> {
        api.connect(credentials)?;
        info!(host = %credentials.host, user = %credentials.user, "connected");

        Ok(Self {
            api,
            host: credentials.host.clone(),
            open: true,
        })
    }

    pub fn close(mut self) -> Result<(), ApiError> {
        self.open = false;
        self.api.disconnect(false)?;
        info!(host = %self.host, "disconnected");
        Ok(())
    }
}

impl<H: Hypervisor> Deref for Session<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.api
    }
}

impl<H: Hypervisor> DerefMut for Session<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.api
    }
}

impl<H: Hypervisor> Drop for Session<'_, H> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }

        self.open = false;
        match self.api.disconnect(false) {
            Ok(()) => info!(host = %self.host, "disconnected after failure"),
            Err(err) => warn!(host = %self.host, error = %err, "failed to disconnect"),
        }
    }
}
