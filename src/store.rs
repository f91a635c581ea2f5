//! The world state store: owns the world and everything around it that an
//! editing session needs, and keeps the storage backend in sync with it.

use log::{debug, info, warn};
use rand::{Rng, distributions::WeightedError};
use thiserror::Error;

use crate::{
    config::{RenderConfig, TownConfig},
    generate::generate_world,
    math::{OutOfBounds, Point},
    render::{RenderItem, project},
    rules::{Action, ActionReport, PlacementEngine, PlacementError},
    world::{World, records::LayerError},
};

pub mod backend;

pub use backend::{FileStore, KeyValueStore, MemoryStore};

pub const BLOCKS_KEY: &str = "blocks";
pub const OBJECTS_KEY: &str = "objects";
pub const SELECTED_KEY: &str = "selected";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),
    #[error("storage backend failed")]
    Io(#[from] std::io::Error),
    #[error("failed to encode or decode stored data")]
    Json(#[from] serde_json::Error),
    #[error("stored world is malformed")]
    Layer(#[from] LayerError),
    #[error("cannot generate a world with these weights")]
    Generation(#[from] WeightedError),
    #[error("no tile is selected")]
    NothingSelected,
}

pub type Listener = Box<dyn FnMut(&ActionReport)>;

pub struct WorldStore<S, R> {
    storage: S,
    rng: R,
    world: World,
    engine: PlacementEngine,
    render: RenderConfig,
    selected: Option<Point>,
    interactive: bool,
    listeners: Vec<Listener>,
}

impl<S, R> WorldStore<S, R>
where
    S: KeyValueStore,
    R: Rng,
{
    /// Loads the world from `storage`, or generates and stores a fresh one if
    /// either layer is missing.
    pub fn load_or_init(storage: S, config: &TownConfig, mut rng: R) -> Result<Self, StoreError> {
        let layers = (storage.get(BLOCKS_KEY)?, storage.get(OBJECTS_KEY)?);
        let (world, fresh) = match layers {
            (Some(blocks), Some(objects)) => {
                let world = World::decode_layers(&blocks, &objects)?;
                info!("Loaded stored {}x{} world", world.dims().width, world.dims().height);
                (world, false)
            }
            _ => {
                info!("No stored world, generating a new one");
                (generate_world(config.world.dims(), &config.generation, &mut rng)?, true)
            }
        };

        let selected = match storage.get(SELECTED_KEY)? {
            Some(text) if !fresh => serde_json::from_str::<Option<Point>>(&text).unwrap_or_else(|e| {
                warn!("Ignoring unreadable stored selection: {e}");
                None
            }),
            _ => None,
        };
        let selected = selected.filter(|&p| {
            let inside = world.dims().contains(p);
            if !inside {
                warn!("Dropping stored selection {p}, it is outside the world");
            }
            inside
        });

        let mut store = WorldStore {
            storage,
            rng,
            world,
            engine: config.placement.engine(),
            render: config.render,
            selected,
            interactive: false,
            listeners: Vec::new(),
        };
        if fresh {
            store.save()?;
        }
        Ok(store)
    }

    /// Writes both layers and the selection.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let (blocks, objects) = self.world.encode_layers()?;
        self.storage.set(BLOCKS_KEY, &blocks)?;
        self.storage.set(OBJECTS_KEY, &objects)?;
        self.save_selection()?;
        info!("Saved world");
        Ok(())
    }

    fn save_selection(&mut self) -> Result<(), StoreError> {
        self.storage.set(SELECTED_KEY, &serde_json::to_string(&self.selected)?)?;
        Ok(())
    }

    /// Applies `action` at `target`, notifies listeners and persists the
    /// result.
    ///
    /// Listeners hear about every change to the world, so they are notified
    /// even when saving fails afterwards.
    pub fn dispatch(&mut self, action: Action, target: Point) -> Result<ActionReport, StoreError> {
        let report = self.engine.apply(action, target, &mut self.world, &mut self.rng)?;
        for listener in &mut self.listeners {
            listener(&report);
        }
        self.save()?;
        Ok(report)
    }

    pub fn dispatch_selected(&mut self, action: Action) -> Result<ActionReport, StoreError> {
        let target = self.selected.ok_or(StoreError::NothingSelected)?;
        self.dispatch(action, target)
    }

    pub fn select_at(&mut self, point: Point) -> Result<(), StoreError> {
        self.world.tiles().check(point)?;
        self.selected = Some(point);
        debug!("Selected {point}");
        self.save_selection()
    }

    pub fn clear_selection(&mut self) -> Result<(), StoreError> {
        self.selected = None;
        self.save_selection()
    }

    /// A click on a tile toggles its selection. Clicks are ignored unless
    /// interactive mode is on.
    ///
    /// Returns whether the click was handled.
    pub fn click(&mut self, point: Point) -> Result<bool, StoreError> {
        if !self.interactive {
            debug!("Ignoring click at {point}, not in interactive mode");
            return Ok(false);
        }
        if self.selected == Some(point) {
            self.clear_selection()?;
        } else {
            self.select_at(point)?;
        }
        Ok(true)
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ActionReport) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn render_items(&self) -> Vec<RenderItem> {
        project(&self.world, self.selected, &self.render)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn selected(&self) -> Option<Point> {
        self.selected
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        io,
        rc::Rc,
    };

    use assertables::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{backend::tests::ScratchDir, *};
    use crate::{catalog::ObjectType, config::WorldConfig, math::Dimensions};

    type TestStore<S> = WorldStore<S, ChaCha8Rng>;

    fn config() -> TownConfig {
        TownConfig {
            world: WorldConfig { width: 12, height: 10, seed: None },
            ..TownConfig::default()
        }
    }

    fn open<S: KeyValueStore>(storage: S) -> TestStore<S> {
        WorldStore::load_or_init(storage, &config(), ChaCha8Rng::seed_from_u64(9)).unwrap()
    }

    /// A store over a stored world of cleared, empty ground.
    fn with_clear_spot() -> TestStore<MemoryStore> {
        let mut storage = MemoryStore::new();
        let world = World::cleared(Dimensions::new(12, 10));
        let (blocks, objects) = world.encode_layers().unwrap();
        storage.set(BLOCKS_KEY, &blocks).unwrap();
        storage.set(OBJECTS_KEY, &objects).unwrap();
        open(storage)
    }

    #[test]
    fn fresh_world_is_persisted_immediately() {
        let store = open(MemoryStore::new());

        assert_eq!(store.world().dims(), Dimensions::new(12, 10));
        assert!(store.world().tiles().iter().all(|t| t.object.kind.is_empty()));
        let blocks = store.storage().get(BLOCKS_KEY).unwrap().expect("blocks were not stored");
        let objects = store.storage().get(OBJECTS_KEY).unwrap().expect("objects were not stored");
        assert_eq!(&World::decode_layers(&blocks, &objects).unwrap(), store.world());
    }

    #[test]
    fn reload_reproduces_the_world() {
        let mut store = with_clear_spot();
        store.dispatch(Action::BuildHouse, Point::new(5, 5)).unwrap();
        store.dispatch(Action::BuildRoad, Point::new(7, 7)).unwrap();
        store.select_at(Point::new(7, 7)).unwrap();
        let world = store.world().clone();

        let reloaded = open(store.into_storage());

        assert_eq!(reloaded.world(), &world);
        assert_eq!(reloaded.selected(), Some(Point::new(7, 7)));
    }

    #[test]
    fn reload_from_files() {
        let scratch = ScratchDir::new("store-reload");
        let world = {
            let mut store = open(FileStore::open(&scratch.0).unwrap());
            store.dispatch(Action::BuildRoad, Point::new(0, 0)).unwrap();
            store.world().clone()
        };

        let reloaded = open(FileStore::open(&scratch.0).unwrap());

        assert_eq!(reloaded.world(), &world);
    }

    #[test]
    fn failed_actions_are_not_persisted() {
        let mut store = with_clear_spot();
        store.dispatch(Action::GrowTree, Point::new(5, 5)).unwrap();
        let stored = store.storage().get(OBJECTS_KEY).unwrap();

        assert_matches!(
            store.dispatch(Action::GrowTree, Point::new(5, 5)),
            Err(StoreError::Placement(PlacementError::PreconditionNotMet { .. }))
        );
        assert_matches!(
            store.dispatch(Action::GrowTree, Point::new(50, 5)),
            Err(StoreError::Placement(PlacementError::OutOfBounds(_)))
        );
        assert_eq!(store.storage().get(OBJECTS_KEY).unwrap(), stored);
    }

    #[test]
    fn listeners_see_every_successful_action() {
        let mut store = with_clear_spot();
        let seen = Rc::new(RefCell::new(Vec::new()));
        store.subscribe({
            let seen = seen.clone();
            move |report| seen.borrow_mut().push((report.action, report.target))
        });

        store.dispatch(Action::GrowTree, Point::new(1, 1)).unwrap();
        _ = store.dispatch(Action::ChopTree, Point::new(2, 2));
        store.dispatch(Action::WaterTree, Point::new(1, 1)).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![(Action::GrowTree, Point::new(1, 1)), (Action::WaterTree, Point::new(1, 1))]
        );
    }

    /// Refuses writes while `broken` is set.
    struct Flaky {
        inner: MemoryStore,
        broken: Rc<Cell<bool>>,
    }

    impl KeyValueStore for Flaky {
        fn get(&self, key: &str) -> io::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
            if self.broken.get() {
                return Err(io::Error::other("disk full"));
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn listeners_hear_of_changes_that_failed_to_save() {
        let broken = Rc::new(Cell::new(false));
        let inner = with_clear_spot().into_storage();
        let mut store = open(Flaky { inner, broken: broken.clone() });
        let seen = Rc::new(RefCell::new(Vec::new()));
        store.subscribe({
            let seen = seen.clone();
            move |report| seen.borrow_mut().push(report.target)
        });

        broken.set(true);
        assert_matches!(store.dispatch(Action::GrowTree, Point::new(2, 3)), Err(StoreError::Io(_)));
        assert_eq!(*seen.borrow(), vec![Point::new(2, 3)]);
        assert_eq!(
            store.world().object(Point::new(2, 3)).unwrap().kind,
            ObjectType::PlantedTree
        );

        broken.set(false);
        store.save().unwrap();
        let reloaded = open(store.into_storage().inner);
        assert_eq!(
            reloaded.world().object(Point::new(2, 3)).unwrap().kind,
            ObjectType::PlantedTree
        );
    }

    #[test]
    fn clicks_need_interactive_mode() {
        let mut store = with_clear_spot();
        assert!(!store.is_interactive());
        assert!(!store.click(Point::new(3, 3)).unwrap());
        assert_none!(store.selected());

        store.set_interactive(true);
        assert!(store.click(Point::new(3, 3)).unwrap());
        assert_eq!(store.selected(), Some(Point::new(3, 3)));
        assert!(store.click(Point::new(3, 3)).unwrap());
        assert_none!(store.selected());

        assert_matches!(store.click(Point::new(-1, 3)), Err(StoreError::OutOfBounds(_)));
    }

    #[test]
    fn dispatch_at_selection() {
        let mut store = with_clear_spot();
        assert_matches!(
            store.dispatch_selected(Action::GrowTree),
            Err(StoreError::NothingSelected)
        );

        store.select_at(Point::new(4, 2)).unwrap();
        store.dispatch_selected(Action::GrowTree).unwrap();

        assert_eq!(
            store.world().object(Point::new(4, 2)).unwrap().kind,
            ObjectType::PlantedTree
        );
    }

    #[test]
    fn stale_selection_is_dropped() {
        let mut storage = with_clear_spot().into_storage();
        storage.set(SELECTED_KEY, r#"{"x":40,"y":2}"#).unwrap();
        assert_none!(open(storage).selected());
    }

    #[test]
    fn unreadable_selection_is_dropped() {
        let mut storage = with_clear_spot().into_storage();
        storage.set(SELECTED_KEY, "{bogus").unwrap();
        let store = open(storage);
        assert_none!(store.selected());
        assert_eq!(store.world().dims(), Dimensions::new(12, 10));
    }

    #[test]
    fn corrupt_layers_fail_to_load() {
        let mut storage = MemoryStore::new();
        storage.set(BLOCKS_KEY, "[[{}]]").unwrap();
        storage.set(OBJECTS_KEY, "[]").unwrap();
        let result = WorldStore::load_or_init(storage, &config(), ChaCha8Rng::seed_from_u64(0));
        assert_matches!(result, Err(StoreError::Layer(_)));
    }
}
