//! Render scheduler.
//!
//! Runs frames on a dedicated render thread. Producers talk to it through a
//! cloneable [`RenderHandle`]; callbacks queued with
//! [`RenderHandle::queue_render`] run on the render thread, in the order they
//! were queued, before the next frame decision.
//!
//! ```text
//!   Stopped --start(driver)--> Running --stop()--> Stopped (driver returned)
//! ```

use crate::error::{Result, StrataError};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use serde::Deserialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// The frame-producing side driven by the scheduler.
pub trait FrameDriver {
    /// Whether the next frame would write anything.
    fn needs_frame(&self) -> bool;

    /// Produce and flush one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be produced.
    fn render_frame(&mut self) -> Result<()>;
}

/// When frames are produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Render only when the driver has changes or a render was forced.
    #[default]
    OnDemand,
    /// Render every frame interval.
    Fixed,
}

/// Scheduler settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Frames per second; bounds how often the driver is consulted.
    pub target_fps: u32,
    /// Frame policy.
    pub mode: RenderMode,
    /// How long `stop` waits for the render thread.
    pub stop_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            mode: RenderMode::OnDemand,
            stop_timeout: Duration::from_millis(500),
        }
    }
}

impl SchedulerConfig {
    /// Time between frame decisions.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }
}

/// Lifecycle state of a [`RenderScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No render thread.
    Stopped,
    /// Render thread active.
    Running,
}

/// Counters reported by [`RenderScheduler::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Frames the driver produced successfully.
    pub frames_rendered: u64,
    /// Frame slots skipped because nothing changed.
    pub frames_skipped: u64,
    /// Frames that returned an error or panicked.
    pub frame_errors: u64,
    /// Queued callbacks executed.
    pub callbacks_run: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames_rendered: AtomicU64,
    frames_skipped: AtomicU64,
    frame_errors: AtomicU64,
    callbacks_run: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            frame_errors: self.frame_errors.load(Ordering::Relaxed),
            callbacks_run: self.callbacks_run.load(Ordering::Relaxed),
        }
    }
}

type Action<D> = Box<dyn FnOnce(&mut D) + Send>;

enum Command<D> {
    Run(Action<D>),
    Force,
    Wake,
}

/// Producer side of a running scheduler.
pub struct RenderHandle<D> {
    sender: Sender<Command<D>>,
}

impl<D> Clone for RenderHandle<D> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<D> std::fmt::Debug for RenderHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHandle")
            .field("queued", &self.sender.len())
            .finish()
    }
}

impl<D> RenderHandle<D> {
    /// Queue a callback to run on the render thread before the next frame.
    ///
    /// Returns `false` if the render thread is gone.
    pub fn queue_render(&self, action: impl FnOnce(&mut D) + Send + 'static) -> bool {
        self.sender.send(Command::Run(Box::new(action))).is_ok()
    }

    /// Render the next frame even if nothing changed.
    ///
    /// Returns `false` if the render thread is gone.
    pub fn force_render(&self) -> bool {
        self.sender.send(Command::Force).is_ok()
    }
}

struct Running<D> {
    sender: Sender<Command<D>>,
    cancel: Arc<AtomicBool>,
    done: Receiver<D>,
    thread: JoinHandle<()>,
}

/// Owns the render thread and its driver.
pub struct RenderScheduler<D> {
    config: SchedulerConfig,
    counters: Arc<Counters>,
    running: Option<Running<D>>,
}

impl<D: FrameDriver + Send + 'static> RenderScheduler<D> {
    /// Create a stopped scheduler.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            counters: Arc::new(Counters::default()),
            running: None,
        }
    }

    /// Scheduler settings.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        if self.running.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Check if the render thread is active.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Snapshot of the frame counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// Producer handle, while running.
    #[must_use]
    pub fn handle(&self) -> Option<RenderHandle<D>> {
        self.running.as_ref().map(|running| RenderHandle {
            sender: running.sender.clone(),
        })
    }

    /// Move `driver` onto a new render thread.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::SchedulerRunning`] if already running, or an IO
    /// error if the thread cannot be spawned.
    pub fn start(&mut self, driver: D) -> Result<RenderHandle<D>> {
        if self.running.is_some() {
            return Err(StrataError::SchedulerRunning);
        }

        let (sender, receiver) = unbounded();
        let (done_tx, done) = bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));

        let render_loop = RenderLoop {
            config: self.config,
            receiver,
            cancel: Arc::clone(&cancel),
            counters: Arc::clone(&self.counters),
        };
        let thread = thread::Builder::new()
            .name("strata-render".into())
            .spawn(move || {
                let driver = render_loop.run(driver);
                let _ = done_tx.send(driver);
            })?;

        debug!(
            fps = self.config.target_fps,
            mode = ?self.config.mode,
            "render scheduler started"
        );
        let handle = RenderHandle {
            sender: sender.clone(),
        };
        self.running = Some(Running {
            sender,
            cancel,
            done,
            thread,
        });
        Ok(handle)
    }

    /// Stop the render thread and take the driver back.
    ///
    /// Waits at most `stop_timeout`; returns `None` if the thread did not
    /// finish in time (it is detached) or was not running.
    pub fn stop(&mut self) -> Option<D> {
        let running = self.running.take()?;
        running.cancel.store(true, Ordering::Release);
        let _ = running.sender.send(Command::Wake);

        match running.done.recv_timeout(self.config.stop_timeout) {
            Ok(driver) => {
                let _ = running.thread.join();
                debug!("render scheduler stopped");
                Some(driver)
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.stop_timeout.as_millis() as u64,
                    "render thread did not stop in time; detaching"
                );
                None
            }
        }
    }
}

impl<D> Drop for RenderScheduler<D> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.store(true, Ordering::Release);
            let _ = running.sender.send(Command::Wake);
        }
    }
}

struct RenderLoop<D> {
    config: SchedulerConfig,
    receiver: Receiver<Command<D>>,
    cancel: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl<D: FrameDriver> RenderLoop<D> {
    fn run(self, mut driver: D) -> D {
        let interval = self.config.frame_interval();
        let mut next_frame = Instant::now() + interval;
        let mut forced = false;

        while !self.cancelled() {
            let remaining = next_frame.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(command) => {
                    self.execute(command, &mut driver, &mut forced);
                    while let Ok(command) = self.receiver.try_recv() {
                        self.execute(command, &mut driver, &mut forced);
                    }
                    if Instant::now() < next_frame {
                        continue;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if self.cancelled() {
                break;
            }

            self.frame(&mut driver, forced);
            forced = false;

            let now = Instant::now();
            next_frame += interval;
            if next_frame < now {
                next_frame = now + interval;
            }
        }
        driver
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn execute(&self, command: Command<D>, driver: &mut D, forced: &mut bool) {
        match command {
            Command::Run(action) => {
                if panic::catch_unwind(AssertUnwindSafe(|| action(driver))).is_err() {
                    warn!("queued render callback panicked");
                }
                Counters::bump(&self.counters.callbacks_run);
            }
            Command::Force => *forced = true,
            Command::Wake => {}
        }
    }

    fn frame(&self, driver: &mut D, forced: bool) {
        let wanted = forced || self.config.mode == RenderMode::Fixed || driver.needs_frame();
        if !wanted {
            Counters::bump(&self.counters.frames_skipped);
            return;
        }

        let started = Instant::now();
        match panic::catch_unwind(AssertUnwindSafe(|| driver.render_frame())) {
            Ok(Ok(())) => {
                Counters::bump(&self.counters.frames_rendered);
                trace!(elapsed_us = started.elapsed().as_micros() as u64, forced, "frame rendered");
            }
            Ok(Err(err)) => {
                Counters::bump(&self.counters.frame_errors);
                warn!(error = %err, "frame failed");
            }
            Err(_) => {
                Counters::bump(&self.counters.frame_errors);
                error!("frame panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct CountingDriver {
        dirty: bool,
        frames: usize,
        fail_next: bool,
        panic_next: bool,
        log: Vec<u32>,
    }

    impl FrameDriver for CountingDriver {
        fn needs_frame(&self) -> bool {
            self.dirty
        }

        fn render_frame(&mut self) -> Result<()> {
            if std::mem::take(&mut self.panic_next) {
                panic!("boom");
            }
            if std::mem::take(&mut self.fail_next) {
                return Err(StrataError::FrameFailed("injected".into()));
            }
            self.frames += 1;
            self.dirty = false;
            Ok(())
        }
    }

    fn fast(mode: RenderMode) -> SchedulerConfig {
        SchedulerConfig {
            target_fps: 200,
            mode,
            stop_timeout: Duration::from_secs(2),
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_frame_interval() {
        let config = SchedulerConfig::default();
        assert_eq!(config.frame_interval(), Duration::from_secs(1) / 60);
        let zero = SchedulerConfig {
            target_fps: 0,
            ..config
        };
        assert_eq!(zero.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_start_and_stop_returns_driver() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        scheduler.start(CountingDriver::default()).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(scheduler.handle().is_some());

        let driver = scheduler.stop().unwrap();
        assert_eq!(driver.frames, 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(scheduler.stop().is_none());
    }

    #[test]
    fn test_start_twice_is_error() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        scheduler.start(CountingDriver::default()).unwrap();
        let err = scheduler.start(CountingDriver::default()).unwrap_err();
        assert!(matches!(err, StrataError::SchedulerRunning));
        scheduler.stop();
    }

    #[test]
    fn test_on_demand_skips_clean_frames() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        scheduler.start(CountingDriver::default()).unwrap();
        assert!(wait_until(|| scheduler.stats().frames_skipped >= 3));
        let driver = scheduler.stop().unwrap();
        assert_eq!(driver.frames, 0);
        assert_eq!(scheduler.stats().frames_rendered, 0);
    }

    #[test]
    fn test_queued_callbacks_run_in_order_before_frame() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        let handle = scheduler.start(CountingDriver::default()).unwrap();
        for i in 0..5 {
            assert!(handle.queue_render(move |d: &mut CountingDriver| d.log.push(i)));
        }
        assert!(handle.queue_render(|d: &mut CountingDriver| d.dirty = true));

        assert!(wait_until(|| scheduler.stats().frames_rendered == 1));
        let driver = scheduler.stop().unwrap();
        assert_eq!(driver.log, vec![0, 1, 2, 3, 4]);
        assert_eq!(driver.frames, 1);
        assert_eq!(scheduler.stats().callbacks_run, 6);
    }

    #[test]
    fn test_force_render_renders_once() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        let handle = scheduler.start(CountingDriver::default()).unwrap();
        assert!(handle.force_render());

        assert!(wait_until(|| scheduler.stats().frames_rendered == 1));
        assert!(wait_until(|| scheduler.stats().frames_skipped >= 2));
        let driver = scheduler.stop().unwrap();
        assert_eq!(driver.frames, 1);
    }

    #[test]
    fn test_fixed_mode_renders_every_interval() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::Fixed));
        scheduler.start(CountingDriver::default()).unwrap();
        assert!(wait_until(|| scheduler.stats().frames_rendered >= 3));
        scheduler.stop().unwrap();
        assert_eq!(scheduler.stats().frames_skipped, 0);
    }

    #[test]
    fn test_frame_errors_are_counted_and_loop_continues() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        let handle = scheduler.start(CountingDriver::default()).unwrap();
        handle.queue_render(|d: &mut CountingDriver| {
            d.fail_next = true;
            d.dirty = true;
        });
        assert!(wait_until(|| scheduler.stats().frame_errors == 1));

        // Still dirty after the failure, so the next slot renders.
        assert!(wait_until(|| scheduler.stats().frames_rendered == 1));
        let driver = scheduler.stop().unwrap();
        assert_eq!(driver.frames, 1);
    }

    #[test]
    fn test_frame_panic_is_caught() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        let handle = scheduler.start(CountingDriver::default()).unwrap();
        handle.queue_render(|d: &mut CountingDriver| {
            d.panic_next = true;
            d.dirty = true;
        });
        assert!(wait_until(|| scheduler.stats().frame_errors == 1));
        assert!(wait_until(|| scheduler.stats().frames_rendered == 1));
        assert!(scheduler.stop().is_some());
    }

    #[test]
    fn test_callback_panic_is_caught() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        let handle = scheduler.start(CountingDriver::default()).unwrap();
        handle.queue_render(|_: &mut CountingDriver| panic!("callback"));
        handle.queue_render(|d: &mut CountingDriver| d.log.push(7));
        assert!(wait_until(|| scheduler.stats().callbacks_run == 2));
        let driver = scheduler.stop().unwrap();
        assert_eq!(driver.log, vec![7]);
    }

    #[test]
    fn test_handle_after_stop_reports_gone() {
        let mut scheduler = RenderScheduler::new(fast(RenderMode::OnDemand));
        let handle = scheduler.start(CountingDriver::default()).unwrap();
        let clone = handle.clone();
        scheduler.stop().unwrap();
        assert!(!clone.force_render());
        assert!(!handle.queue_render(|_: &mut CountingDriver| {}));
    }

    #[test]
    fn test_render_mode_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: RenderMode,
        }
        let w: Wrapper = toml::from_str("mode = \"fixed\"").unwrap();
        assert_eq!(w.mode, RenderMode::Fixed);
        let w: Wrapper = toml::from_str("mode = \"on_demand\"").unwrap();
        assert_eq!(w.mode, RenderMode::OnDemand);
    }
}
