use crate::concurrency::shutdown_requested;
use crate::extract::{ExtractReport, Extractor, PassKind};
use crate::resolver::ManifestResolver;
use crate::CoreError;
use cardcut_remote::{Fetcher, RemoteConfig};
use cardcut_schema::{
    find_player_cards, find_references, try_traverse, CardFilter, ObjectNode, Reference,
    ReferenceMarkers,
};
use cardcut_store::{CardStore, DataLayout, SpriteCache};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Outcome of one resolved sub-manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceReport {
    /// `"campaign"` or `"scenario"`.
    pub kind: &'static str,
    pub path: String,
    pub report: ExtractReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub player_cards: ExtractReport,
    pub references: Vec<ReferenceReport>,
    pub totals: ExtractReport,
}

/// End-to-end extraction: the player-card bag of the root save, then every
/// campaign and standalone scenario it references.
pub struct Pipeline<F: Fetcher> {
    layout: DataLayout,
    config: RemoteConfig,
    fetcher: F,
    filter: CardFilter,
    markers: ReferenceMarkers,
}

impl<F: Fetcher> Pipeline<F> {
    pub fn new(layout: DataLayout, config: RemoteConfig, fetcher: F) -> Self {
        Self {
            layout,
            config,
            fetcher,
            filter: CardFilter::default(),
            markers: ReferenceMarkers::default(),
        }
    }

    pub fn run(&self, manifest_path: &Path) -> Result<RunReport, CoreError> {
        self.layout.initialize()?;

        let resolver = ManifestResolver::new(self.layout.clone(), &self.config, &self.fetcher);
        let root = resolver.load_root(manifest_path)?;

        let mut report = RunReport::default();

        let player_cards = find_player_cards(&root)?;
        info!("extracting player cards");
        report.player_cards =
            self.run_pass(std::slice::from_ref(player_cards), PassKind::PlayerCards)?;
        report.totals.merge(&report.player_cards);

        for reference in find_references(&root, &self.markers) {
            if shutdown_requested() {
                return Err(CoreError::Interrupted);
            }
            let path = reference.path();
            info!("extracting {path}");
            let manifest = resolver.load_reference(path)?;
            let pass = self.run_pass(&manifest.object_states, PassKind::Encounter)?;
            report.totals.merge(&pass);
            report.references.push(ReferenceReport {
                kind: match reference {
                    Reference::Campaign(_) => "campaign",
                    Reference::Scenario(_) => "scenario",
                },
                path: path.to_string(),
                report: pass,
            });
        }

        info!(
            "done: {} written, {} existing, {} skipped, {} failed",
            report.totals.written,
            report.totals.existing,
            report.totals.skipped,
            report.totals.failed
        );
        Ok(report)
    }

    /// Prefetch every sheet under `nodes`, then extract every card.
    fn run_pass(&self, nodes: &[ObjectNode], pass: PassKind) -> Result<ExtractReport, CoreError> {
        let sprites = SpriteCache::new(self.layout.clone());
        let cards = CardStore::new(self.layout.clone());
        let extractor = Extractor::new(&sprites, &cards, &self.fetcher, pass);
        let mut report = ExtractReport::default();

        try_traverse(nodes, &self.filter, &mut |node| {
            if shutdown_requested() {
                return Err(CoreError::Interrupted);
            }
            report.sheets_fetched += extractor.prefetch(node)?;
            Ok(())
        })?;

        try_traverse(nodes, &self.filter, &mut |node| {
            if shutdown_requested() {
                return Err(CoreError::Interrupted);
            }
            report.record(&extractor.extract(node));
            Ok(())
        })?;

        Ok(report)
    }
}
