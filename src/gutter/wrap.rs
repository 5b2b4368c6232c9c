use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    Wrapped,
    Unwrapped,
}

impl WrapMode {
    pub fn from_flag(word_wrap: bool) -> Self {
        if word_wrap {
            WrapMode::Wrapped
        } else {
            WrapMode::Unwrapped
        }
    }

    pub fn is_wrapped(self) -> bool {
        self == WrapMode::Wrapped
    }

    pub fn toggled(self) -> Self {
        match self {
            WrapMode::Wrapped => WrapMode::Unwrapped,
            WrapMode::Unwrapped => WrapMode::Wrapped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerWidth {
    TracksViewport,
    Unbounded,
}

/// Text container geometry. Height is unbounded in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerConfig {
    pub width: ContainerWidth,
    pub horizontal_scroll: bool,
    pub vertical_scroll: bool,
    pub size_to_fit_longest_line: bool,
}

impl ContainerConfig {
    pub fn for_mode(mode: WrapMode) -> Self {
        match mode {
            WrapMode::Wrapped => Self {
                width: ContainerWidth::TracksViewport,
                horizontal_scroll: false,
                vertical_scroll: true,
                size_to_fit_longest_line: false,
            },
            WrapMode::Unwrapped => Self {
                width: ContainerWidth::Unbounded,
                horizontal_scroll: true,
                vertical_scroll: true,
                size_to_fit_longest_line: true,
            },
        }
    }
}

/// The text view being reconfigured.
pub trait WrapHost {
    fn configure_container(&mut self, config: ContainerConfig);
    fn force_layout(&mut self);
    /// Line positions depend on wrapping; the gutter must recompute them.
    fn invalidate_gutter(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WordWrapSwitch {
    mode: WrapMode,
}

impl WordWrapSwitch {
    pub fn new(mode: WrapMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> WrapMode {
        self.mode
    }

    pub fn config(&self) -> ContainerConfig {
        ContainerConfig::for_mode(self.mode)
    }

    /// Applies the current mode to a freshly created host.
    pub fn apply(&self, host: &mut dyn WrapHost) {
        Self::reconfigure(self.mode, host);
    }

    /// Returns `true` if the mode changed.
    pub fn set_mode(&mut self, mode: WrapMode, host: &mut dyn WrapHost) -> bool {
        if mode == self.mode {
            return false;
        }
        info!(target: "wrap", from = ?self.mode, to = ?mode, "wrap_mode_changed");
        self.mode = mode;
        Self::reconfigure(mode, host);
        true
    }

    pub fn toggle(&mut self, host: &mut dyn WrapHost) -> WrapMode {
        self.set_mode(self.mode.toggled(), host);
        self.mode
    }

    /// Brings the display in line with a note's persisted flag.
    pub fn sync_with_note(&mut self, word_wrap: bool, host: &mut dyn WrapHost) -> bool {
        self.set_mode(WrapMode::from_flag(word_wrap), host)
    }

    fn reconfigure(mode: WrapMode, host: &mut dyn WrapHost) {
        host.configure_container(ContainerConfig::for_mode(mode));
        host.force_layout();
        host.invalidate_gutter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl Write for LockedWriter<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[derive(Debug, PartialEq)]
    enum Call {
        Configure(ContainerConfig),
        Layout,
        Gutter,
    }

    #[derive(Default)]
    struct RecordingHost {
        calls: Vec<Call>,
    }

    impl WrapHost for RecordingHost {
        fn configure_container(&mut self, config: ContainerConfig) {
            self.calls.push(Call::Configure(config));
        }

        fn force_layout(&mut self) {
            self.calls.push(Call::Layout);
        }

        fn invalidate_gutter(&mut self) {
            self.calls.push(Call::Gutter);
        }
    }

    #[test]
    fn transition_reconfigures_then_lays_out_then_dirties_gutter() {
        let mut host = RecordingHost::default();
        let mut switch = WordWrapSwitch::new(WrapMode::Wrapped);
        assert!(switch.set_mode(WrapMode::Unwrapped, &mut host));
        assert_eq!(
            host.calls,
            vec![
                Call::Configure(ContainerConfig::for_mode(WrapMode::Unwrapped)),
                Call::Layout,
                Call::Gutter,
            ]
        );
    }

    #[test]
    fn unwrapped_scrolls_both_ways_and_sizes_to_fit() {
        let config = ContainerConfig::for_mode(WrapMode::Unwrapped);
        assert_eq!(config.width, ContainerWidth::Unbounded);
        assert!(config.horizontal_scroll && config.vertical_scroll);
        assert!(config.size_to_fit_longest_line);
    }

    #[test]
    fn round_trip_restores_width_tracking() {
        let mut host = RecordingHost::default();
        let mut switch = WordWrapSwitch::default();
        let original = switch.config();
        switch.toggle(&mut host);
        switch.toggle(&mut host);
        assert_eq!(switch.config(), original);
        assert_eq!(switch.config().width, ContainerWidth::TracksViewport);
        assert!(!switch.config().horizontal_scroll);
        assert_eq!(host.calls.len(), 6);
    }

    #[test]
    fn same_mode_is_a_no_op() {
        let mut host = RecordingHost::default();
        let mut switch = WordWrapSwitch::new(WrapMode::Wrapped);
        assert!(!switch.sync_with_note(true, &mut host));
        assert!(host.calls.is_empty());
        assert!(switch.sync_with_note(false, &mut host));
        assert_eq!(switch.mode(), WrapMode::Unwrapped);
    }

    #[test]
    fn mode_change_is_logged_under_wrap_target() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(BufferWriter {
                inner: buffer.clone(),
            })
            .finish();

        with_default(subscriber, || {
            let mut host = RecordingHost::default();
            let mut switch = WordWrapSwitch::new(WrapMode::Wrapped);
            switch.toggle(&mut host);
            switch.sync_with_note(false, &mut host);
        });

        let logs = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(logs.matches("wrap_mode_changed").count(), 1);
        assert!(logs.contains("wrap:"));
        assert!(logs.contains("to=Unwrapped"));
    }
}
