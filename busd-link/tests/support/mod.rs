use busd_link::{ConfigSection, ConfigStore, Diag, RouterApi};
use integration_test_utils::{RecordingRouter, RecordingSink};
use std::sync::Arc;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

pub(crate) fn store(sections: &[(&str, &[(&str, &str)])]) -> ConfigStore {
    ConfigStore::from_sections(
        sections
            .iter()
            .map(|(name, pairs)| ConfigSection::from_pairs(*name, pairs)),
    )
}

pub(crate) struct Rig {
    pub(crate) router: Arc<RecordingRouter>,
    pub(crate) sink: Arc<RecordingSink>,
    pub(crate) diag: Diag,
}

impl Rig {
    pub(crate) fn router_api(&self) -> Arc<dyn RouterApi> {
        self.router.clone()
    }
}

pub(crate) fn rig(config: ConfigStore) -> Rig {
    init_tracing();
    let router = Arc::new(RecordingRouter::new(config));
    let sink = Arc::new(RecordingSink::default());
    let diag = Diag::new(sink.clone());
    Rig { router, sink, diag }
}
