//! The process-wide pdfium engine.
//!
//! pdfium is not re-entrant. With the `thread_safe` bindings,
//! `FPDF_InitLibrary` takes a global lock that is only released when the
//! binding is dropped, so two live `Pdfium` values can never do work at the
//! same time. Instead of re-binding per document, one dedicated thread owns
//! the only binding in the process and runs the jobs sent to it in arrival
//! order. Callers block on the reply.
//!
//! The binding is created by the first successful call and reused for the
//! lifetime of the process. A failed binding is not remembered: the next
//! call tries again.

use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

type Job = Box<dyn FnOnce(&Pdfium) + Send>;

static ENGINE: Lazy<Mutex<Option<mpsc::Sender<Job>>>> = Lazy::new(|| Mutex::new(None));

fn slot() -> MutexGuard<'static, Option<mpsc::Sender<Job>>> {
    ENGINE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Start the engine if it is not running yet.
///
/// `library_path` is only consulted for the first binding; once the engine
/// runs, later paths are ignored.
pub fn ensure_started(library_path: Option<&Path>) -> Result<(), String> {
    sender(library_path).map(|_| ())
}

/// True once a binding has been established.
pub fn is_running() -> bool {
    slot().is_some()
}

/// Run `job` on the engine thread and wait for its result.
///
/// # Errors
/// A description when pdfium cannot be bound, the engine thread is gone,
/// or `job` panicked.
pub fn run<T, F>(library_path: Option<&Path>, job: F) -> Result<T, String>
where
    F: FnOnce(&Pdfium) -> T + Send + 'static,
    T: Send + 'static,
{
    let engine = sender(library_path)?;
    let (reply_tx, reply_rx) = mpsc::channel();
    let boxed: Job = Box::new(move |pdfium: &Pdfium| {
        let _ = reply_tx.send(job(pdfium));
    });

    if engine.send(boxed).is_err() {
        slot().take();
        return Err("pdfium engine thread has stopped".to_string());
    }
    // The reply sender is dropped unsent only when the job panicked.
    reply_rx
        .recv()
        .map_err(|_| "pdfium job panicked".to_string())
}

fn sender(library_path: Option<&Path>) -> Result<mpsc::Sender<Job>, String> {
    let mut slot = slot();
    if let Some(tx) = slot.as_ref() {
        return Ok(tx.clone());
    }

    let (job_tx, job_rx) = mpsc::channel::<Job>();
    let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
    let path = library_path.map(Path::to_path_buf);

    std::thread::Builder::new()
        .name("pdfium-engine".to_string())
        .spawn(move || {
            let pdfium = match bind_pdfium(path.as_deref()) {
                Ok(p) => p,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            info!("pdfium engine started");

            for job in job_rx {
                if panic::catch_unwind(AssertUnwindSafe(|| job(&pdfium))).is_err() {
                    warn!("pdfium job panicked; engine keeps running");
                }
            }
            debug!("pdfium engine stopped");
        })
        .map_err(|e| format!("failed to start pdfium engine thread: {}", e))?;

    ready_rx
        .recv()
        .map_err(|_| "pdfium engine thread exited during start-up".to_string())??;

    *slot = Some(job_tx.clone());
    Ok(job_tx)
}

/// Bind pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the platform
/// library in the working directory, then the system library.
///
/// A path may name the library file itself or the directory holding it.
fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, String> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = if let Some(path) = configured {
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        Pdfium::bind_to_library(&lib).map_err(|e| format!("{}: {:?}", lib.display(), e))?
    } else {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| format!("{:?}", e))?
    };

    Ok(Pdfium::new(bindings))
}
