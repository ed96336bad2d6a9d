use once_cell::sync::Lazy;
use std::time::{SystemTime, UNIX_EPOCH};

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("coachdesk-io")
        .build()
        .expect("Failed to build Tokio runtime")
});

pub fn spawn_async<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUNTIME.spawn(fut)
}

/// Runs `fut` on the tokio runtime and hands its output to `on_done` on the
/// GLib main loop, where widgets may be touched.
#[cfg(feature = "gui")]
pub fn run_async_to_main<T, Fut, F>(fut: Fut, on_done: F)
where
    T: Send + 'static,
    Fut: std::future::Future<Output = T> + Send + 'static,
    F: FnOnce(T) + 'static,
{
    let handle = spawn_async(fut);
    glib::spawn_future_local(async move {
        match handle.await {
            Ok(value) => on_done(value),
            Err(err) => log::error!("Background task failed: {err}"),
        }
    });
}

/// Project URL with a scheme (https unless one is given) and no trailing
/// slash.
pub fn normalize_url(input: &str) -> String {
    let base = input.trim().trim_end_matches('/');
    match base.split_once("://") {
        Some((scheme, _)) if scheme == "http" || scheme == "https" => base.to_owned(),
        _ => ["https://", base].concat(),
    }
}

pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_scheme_only_when_missing() {
        assert_eq!(normalize_url(" demo.example.co "), "https://demo.example.co");
        assert_eq!(normalize_url("http://localhost:54321/"), "http://localhost:54321");
    }
}
