use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One pending timer or fade completion.
///
/// The timer is owned: dropping or replacing the handle aborts it, and the
/// session-wide token aborts every timer at teardown.
#[derive(Debug)]
pub(crate) struct ScopedTimer {
    handle: JoinHandle<()>,
}

impl ScopedTimer {
    pub(crate) fn spawn<T>(
        after: Duration,
        sender: mpsc::UnboundedSender<T>,
        message: T,
        token: CancellationToken,
    ) -> Self
    where
        T: Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = sender.send(message);
                }
            }
        });

        Self { handle }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
