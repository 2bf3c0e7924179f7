//! Process-wide handlers for failures nothing else caught.
//!
//! Both paths log what happened and terminate with [`FATAL_EXIT_CODE`].
//! A panic terminates immediately. A rejected background task first lets
//! the HTTP server drain in-flight requests when a handle was supplied.
//!
//! Call the installers once from the bootstrap sequence. Termination goes
//! through an [`Exit`] callback; [`process_exit`] is the real one. A graceful
//! stop also resolves the server future the bootstrap is awaiting, so the
//! bootstrap must consult [`RejectionHook::take_trigger`] before it returns.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::PanicHookInfo;
use std::sync::Arc;

use actix_web::dev::ServerHandle;
use actix_web::rt::task::{JoinError, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::error;

use crate::domain::error::short_type_name;

/// Exit status for both fatal paths.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Termination callback receiving the exit status.
pub type Exit = Arc<dyn Fn(i32) + Send + Sync>;

/// Exit callback that terminates the process.
#[must_use]
pub fn process_exit() -> Exit {
    Arc::new(|code| std::process::exit(code))
}

/// Which fatal path fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// A panic escaped every handler.
    UncaughtException,
    /// A background task failed and nobody awaited it.
    UnhandledRejection,
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UncaughtException => "UNCAUGHT EXCEPTION",
            Self::UnhandledRejection => "UNHANDLED REJECTION",
        })
    }
}

fn log_fatal(kind: FatalKind, name: &str, message: &str) {
    error!(kind = %kind, name, reason = message, "{kind}! Shutting down...");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

fn panic_name(info: &PanicHookInfo<'_>) -> String {
    info.location().map_or_else(
        || "panic".to_owned(),
        |location| format!("panic at {location}"),
    )
}

/// Install the panic hook: log, then exit with [`FATAL_EXIT_CODE`].
///
/// Replaces any previously installed hook.
pub fn install_uncaught_exception_hook(exit: Exit) {
    std::panic::set_hook(Box::new(move |info| {
        log_fatal(
            FatalKind::UncaughtException,
            &panic_name(info),
            &panic_message(info.payload()),
        );
        exit(FATAL_EXIT_CODE);
    }));
}

/// A background failure nobody handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Short name of the failed operation or error type.
    pub name: String,
    /// Error message.
    pub message: String,
}

impl Rejection {
    /// Describe an error that escaped a background task.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self {
            name: short_type_name::<E>(),
            message: error.to_string(),
        }
    }
}

/// Handle background work reports its failures to.
#[derive(Debug, Clone)]
pub struct RejectionReporter {
    tx: mpsc::UnboundedSender<Rejection>,
}

impl RejectionReporter {
    /// Report a rejection. Ignored once the watcher has shut the process down.
    pub fn report(&self, rejection: Rejection) {
        if self.tx.send(rejection).is_err() {
            tracing::debug!("rejection watcher gone; dropping report");
        }
    }

    /// Run `fut` on the current Actix runtime, reporting its error if it fails.
    pub fn spawn<F, E>(&self, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: std::error::Error + 'static,
    {
        let reporter = self.clone();
        actix_web::rt::spawn(async move {
            if let Err(error) = fut.await {
                reporter.report(Rejection::from_error(&error));
            }
        })
    }
}

/// Receiving end of the rejection channel, consumed by
/// [`install_unhandled_rejection_hook`].
#[derive(Debug)]
pub struct RejectionWatch {
    rx: mpsc::UnboundedReceiver<Rejection>,
}

/// Create the rejection channel.
///
/// Hand the reporter to whatever spawns background work before the server
/// exists, then install the watch once the server handle is known.
#[must_use]
pub fn unhandled_rejections() -> (RejectionReporter, RejectionWatch) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RejectionReporter { tx }, RejectionWatch { rx })
}

/// Running watcher returned by [`install_unhandled_rejection_hook`].
#[derive(Debug)]
pub struct RejectionHook {
    task: JoinHandle<()>,
    fired: oneshot::Receiver<Rejection>,
}

impl RejectionHook {
    /// Take the rejection that triggered shutdown, if one has.
    ///
    /// The rejection is recorded before the server is asked to stop, so a
    /// server future that resolved because of the watcher always finds it.
    pub fn take_trigger(&mut self) -> Option<Rejection> {
        self.fired.try_recv().ok()
    }

    /// Wait for the watcher to finish, returning the rejection that
    /// triggered shutdown unless it was already taken.
    ///
    /// # Errors
    /// Returns the runtime's [`JoinError`] if the watcher task panicked or
    /// was cancelled.
    pub async fn join(mut self) -> Result<Option<Rejection>, JoinError> {
        (&mut self.task).await?;
        Ok(self.take_trigger())
    }
}

/// Watch for the first rejection: log it, stop `server` gracefully if
/// supplied, then exit with [`FATAL_EXIT_CODE`].
///
/// The watcher ends quietly when every reporter is dropped. Must be called
/// from within an Actix runtime.
pub fn install_unhandled_rejection_hook(
    watch: RejectionWatch,
    server: Option<ServerHandle>,
    exit: Exit,
) -> RejectionHook {
    let RejectionWatch { mut rx } = watch;
    let (fired_tx, fired) = oneshot::channel();
    let task = actix_web::rt::spawn(async move {
        let Some(rejection) = rx.recv().await else {
            return;
        };
        log_fatal(
            FatalKind::UnhandledRejection,
            &rejection.name,
            &rejection.message,
        );
        if fired_tx.send(rejection).is_err() {
            tracing::debug!("rejection hook handle dropped before shutdown");
        }
        if let Some(server) = server {
            server.stop(true).await;
        }
        exit(FATAL_EXIT_CODE);
    });
    RejectionHook { task, fired }
}
