//! Compiler worker thread.
//!
//! The compiler runs on its own OS thread and is driven through a job
//! channel. Callers block on the reply with a timeout, so a hung or
//! panicking compiler never takes the caller down with it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::{CompileError, CompileOutput, TemplateCompiler};

enum Job {
    Compile {
        text: String,
        filename: String,
        reply: Sender<Result<CompileOutput, CompileError>>,
        span: tracing::Span,
    },
    Shutdown,
}

/// Handle to a compiler worker thread.
///
/// Jobs are processed one at a time in submission order. When a job times
/// out, its worker is retired: it finishes the jobs already queued on it,
/// discards their late replies and stops, while later jobs go to a fresh
/// worker sharing the same compiler. The current worker is told to shut
/// down when the handle is dropped.
pub struct WorkerCompiler {
    compiler: Arc<dyn TemplateCompiler>,
    tx: Mutex<Sender<Job>>,
    timeout: Duration,
}

impl WorkerCompiler {
    /// Spawn a worker owning `compiler`.
    pub fn spawn<C>(compiler: C, timeout: Duration) -> std::io::Result<Self>
    where
        C: TemplateCompiler + 'static,
    {
        let compiler: Arc<dyn TemplateCompiler> = Arc::new(compiler);
        let tx = spawn_worker(Arc::clone(&compiler))?;
        Ok(Self {
            compiler,
            tx: Mutex::new(tx),
            timeout,
        })
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the worker behind `stuck` unless another caller already did.
    fn retire(&self, stuck: &Sender<Job>) {
        let mut tx = self.tx.lock();
        if !tx.same_channel(stuck) {
            return;
        }
        match spawn_worker(Arc::clone(&self.compiler)) {
            Ok(fresh) => {
                let _ = std::mem::replace(&mut *tx, fresh).send(Job::Shutdown);
                tracing::debug!("retired stuck compiler worker");
            }
            Err(err) => {
                tracing::error!(error = %err, "could not replace stuck compiler worker");
            }
        }
    }
}

fn spawn_worker(compiler: Arc<dyn TemplateCompiler>) -> std::io::Result<Sender<Job>> {
    let (tx, rx) = unbounded::<Job>();

    thread::Builder::new()
        .name("lumen-compiler".into())
        .spawn(move || {
            while let Ok(job) = rx.recv() {
                match job {
                    Job::Compile {
                        text,
                        filename,
                        reply,
                        span,
                    } => {
                        let _guard = span.enter();
                        let result =
                            catch_unwind(AssertUnwindSafe(|| compiler.compile(&text, &filename)))
                                .unwrap_or_else(|_| {
                                    tracing::error!(%filename, "compiler panicked");
                                    Err(CompileError::Panicked)
                                });
                        let _ = reply.send(result);
                    }
                    Job::Shutdown => break,
                }
            }
            tracing::debug!("compiler worker stopped");
        })?;

    Ok(tx)
}

impl TemplateCompiler for WorkerCompiler {
    fn compile(&self, text: &str, filename: &str) -> Result<CompileOutput, CompileError> {
        let tx = self.tx.lock().clone();
        let (reply, response) = bounded(1);
        tx.send(Job::Compile {
            text: text.to_string(),
            filename: filename.to_string(),
            reply,
            span: tracing::Span::current(),
        })
        .map_err(|_| CompileError::WorkerGone)?;

        match response.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(filename, timeout = ?self.timeout, "compiler timed out");
                self.retire(&tx);
                Err(CompileError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Queued on a worker that was retired before reaching the job
                if !self.tx.lock().same_channel(&tx) {
                    return self.compile(text, filename);
                }
                Err(CompileError::WorkerGone)
            }
        }
    }
}

impl Drop for WorkerCompiler {
    fn drop(&mut self) {
        let _ = self.tx.get_mut().send(Job::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl TemplateCompiler for Echo {
        fn compile(&self, text: &str, _filename: &str) -> Result<CompileOutput, CompileError> {
            Ok(CompileOutput {
                code: format!("{text};\n"),
                ..CompileOutput::default()
            })
        }
    }

    struct Panics;

    impl TemplateCompiler for Panics {
        fn compile(&self, text: &str, _filename: &str) -> Result<CompileOutput, CompileError> {
            if text == "boom" {
                panic!("compiler blew up");
            }
            Ok(CompileOutput {
                code: text.to_string(),
                ..CompileOutput::default()
            })
        }
    }

    struct Sleeps(Duration);

    impl TemplateCompiler for Sleeps {
        fn compile(&self, _text: &str, _filename: &str) -> Result<CompileOutput, CompileError> {
            thread::sleep(self.0);
            Ok(CompileOutput::default())
        }
    }

    #[test]
    fn test_round_trip() {
        let worker = WorkerCompiler::spawn(Echo, Duration::from_secs(5)).unwrap();
        let output = worker.compile("<div/>", "a.astro").unwrap();
        assert_eq!(output.code, "<div/>;\n");
    }

    #[test]
    fn test_panic_is_contained() {
        let worker = WorkerCompiler::spawn(Panics, Duration::from_secs(5)).unwrap();
        assert_eq!(
            worker.compile("boom", "a.astro"),
            Err(CompileError::Panicked)
        );
        // The worker keeps serving
        assert_eq!(worker.compile("ok", "a.astro").unwrap().code, "ok");
    }

    struct SlowOn(&'static str, Duration);

    impl TemplateCompiler for SlowOn {
        fn compile(&self, text: &str, _filename: &str) -> Result<CompileOutput, CompileError> {
            if text == self.0 {
                thread::sleep(self.1);
            }
            Ok(CompileOutput {
                code: text.to_string(),
                ..CompileOutput::default()
            })
        }
    }

    #[test]
    fn test_timeout_does_not_stall_later_compiles() {
        let worker = WorkerCompiler::spawn(
            SlowOn("slow", Duration::from_millis(400)),
            Duration::from_millis(50),
        )
        .unwrap();

        assert_eq!(
            worker.compile("slow", "a.astro"),
            Err(CompileError::Timeout(Duration::from_millis(50)))
        );
        assert_eq!(worker.compile("fast", "b.astro").unwrap().code, "fast");
        assert_eq!(worker.compile("again", "c.astro").unwrap().code, "again");
    }

    #[test]
    fn test_timeout() {
        let worker =
            WorkerCompiler::spawn(Sleeps(Duration::from_millis(500)), Duration::from_millis(20))
                .unwrap();
        assert_eq!(
            worker.compile("<div/>", "a.astro"),
            Err(CompileError::Timeout(Duration::from_millis(20)))
        );
    }
}
