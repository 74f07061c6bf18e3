//! Test utilities & fixtures.
//! Recording collaborators and engine builders shared by the integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use claimwarden::claims::{
    Capabilities, Claim, ClaimEngine, ClaimStoreBuilder, Collaborators, EconomyService,
    HighlightStyle, Location, MemoryClaimStore, PlayerId, PreviewHandle, RegionAdvisory,
    ToolClick, ToolOutcome, Visualizer,
};
use claimwarden::config::ClaimsConfig;
use parking_lot::Mutex;
use tempfile::TempDir;

/// Remembers every preview shown and reverted.
#[derive(Default)]
pub struct RecordingVisualizer {
    next: Mutex<u64>,
    pub shown: Mutex<Vec<(PlayerId, HighlightStyle, usize)>>,
    pub marks: Mutex<Vec<(PlayerId, Location)>>,
    pub reverted: Mutex<Vec<PreviewHandle>>,
}

impl RecordingVisualizer {
    fn handle(&self) -> PreviewHandle {
        let mut next = self.next.lock();
        *next += 1;
        PreviewHandle(*next)
    }

    #[allow(dead_code)]
    pub fn last_style(&self) -> Option<HighlightStyle> {
        self.shown.lock().last().map(|(_, style, _)| *style)
    }
}

impl Visualizer for RecordingVisualizer {
    fn show(&self, player: PlayerId, claims: &[Claim], style: HighlightStyle, _ttl: Duration) -> Option<PreviewHandle> {
        self.shown.lock().push((player, style, claims.len()));
        Some(self.handle())
    }

    fn mark(&self, player: PlayerId, location: &Location, _ttl: Duration) -> Option<PreviewHandle> {
        self.marks.lock().push((player, location.clone()));
        Some(self.handle())
    }

    fn revert(&self, _player: PlayerId, handle: PreviewHandle) {
        self.reverted.lock().push(handle);
    }
}

/// Region advisory that forbids a whole world.
#[derive(Default)]
pub struct WorldBan {
    pub forbidden_world: Mutex<Option<String>>,
    pub unloaded: Mutex<bool>,
}

impl RegionAdvisory for WorldBan {
    fn is_present(&self) -> bool {
        !*self.unloaded.lock()
    }

    fn can_build(&self, _player: PlayerId, location: &Location) -> bool {
        self.forbidden_world.lock().as_deref() != Some(location.world.as_str())
    }

    fn overlaps_forbidden(&self, _player: PlayerId, claim: &Claim) -> bool {
        self.forbidden_world.lock().as_deref() == Some(claim.world.as_str())
    }
}

/// In-memory wallet.
#[derive(Default)]
pub struct Wallets {
    pub balances: Mutex<HashMap<PlayerId, f64>>,
}

#[allow(dead_code)]
impl Wallets {
    pub fn fund(&self, player: PlayerId, amount: f64) {
        *self.balances.lock().entry(player).or_insert(0.0) += amount;
    }

    pub fn balance(&self, player: PlayerId) -> f64 {
        self.balances.lock().get(&player).copied().unwrap_or(0.0)
    }
}

impl EconomyService for Wallets {
    fn has(&self, player: PlayerId, amount: f64) -> bool {
        self.balance(player) >= amount
    }

    fn withdraw(&self, player: PlayerId, amount: f64) -> bool {
        let mut balances = self.balances.lock();
        let balance = balances.entry(player).or_insert(0.0);
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }

    fn deposit(&self, player: PlayerId, amount: f64) {
        *self.balances.lock().entry(player).or_insert(0.0) += amount;
    }
}

/// Engine plus handles to its recording collaborators.
#[allow(dead_code)]
pub struct Harness {
    pub engine: ClaimEngine,
    pub visualizer: Arc<RecordingVisualizer>,
    pub region: Arc<WorldBan>,
    pub wallets: Arc<Wallets>,
}

/// Settings with a generous starting balance so tests can claim freely.
#[allow(dead_code)]
pub fn test_settings() -> ClaimsConfig {
    ClaimsConfig {
        initial_blocks: 1000,
        ..ClaimsConfig::default()
    }
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(test_settings())
}

#[allow(dead_code)]
pub fn harness_with(settings: ClaimsConfig) -> Harness {
    let visualizer = Arc::new(RecordingVisualizer::default());
    let region = Arc::new(WorldBan::default());
    let wallets = Arc::new(Wallets::default());
    let collaborators = Collaborators {
        region: region.clone(),
        visualizer: visualizer.clone(),
        economy: Some(wallets.clone() as Arc<dyn EconomyService>),
    };
    let engine = ClaimEngine::open(settings, Arc::new(MemoryClaimStore::new()), collaborators)
        .expect("engine");
    Harness {
        engine,
        visualizer,
        region,
        wallets,
    }
}

/// Engine over a fresh sled store in a temp dir.
#[allow(dead_code)]
pub fn sled_engine(dir: &TempDir) -> ClaimEngine {
    let store = ClaimStoreBuilder::new(dir.path().join("claims"))
        .open()
        .expect("sled store");
    ClaimEngine::open(test_settings(), Arc::new(store), Collaborators::default()).expect("engine")
}

#[allow(dead_code)]
pub fn at(x: i32, z: i32) -> Location {
    Location::new("world", x, 64, z)
}

/// Click with ordinary player capabilities.
#[allow(dead_code)]
pub fn click(engine: &mut ClaimEngine, player: PlayerId, location: Location) -> ToolOutcome {
    click_as(engine, player, location, Capabilities::player())
}

#[allow(dead_code)]
pub fn click_as(
    engine: &mut ClaimEngine,
    player: PlayerId,
    location: Location,
    capabilities: Capabilities,
) -> ToolOutcome {
    engine
        .use_tool(&ToolClick::new(player, location, capabilities))
        .expect("tool click")
}
