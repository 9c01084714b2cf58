//! Kind creation and destruction.
//!
//! `create` either installs a fully populated [`LiveKind`] or leaves the
//! descriptor untouched; nothing partially built escapes. `destroy`
//! purges every arena best-effort and releases the kind's storage.

use numakind_core::{ArenaEngine, ArenaId, DescriptorState, KindError, Partition, Topology};
use tracing::{debug, warn};

use crate::config::KindConfig;
use crate::descriptor::{KindDescriptor, LiveKind};
use crate::router::ArenaRouter;
use crate::strategy::RoutingStrategy;

impl<E: ArenaEngine, T: Topology> ArenaRouter<E, T> {
    /// Make `kind` live: copy `name`, size the arena map for `strategy`,
    /// and register one arena per slot with `partition`.
    ///
    /// On any failure the descriptor stays Uninitialized. Arenas already
    /// registered by a failed call are purged before returning.
    pub fn create(
        &self,
        kind: &mut KindDescriptor,
        strategy: RoutingStrategy,
        partition: Partition,
        name: &str,
    ) -> Result<(), KindError> {
        match kind.state() {
            DescriptorState::Uninitialized => {}
            state => return Err(KindError::NotUninitialized { state }),
        }
        if name.is_empty() {
            return Err(KindError::EmptyName);
        }

        let mut owned_name = String::new();
        owned_name
            .try_reserve_exact(name.len())
            .map_err(|_| KindError::MallocFailure)?;
        owned_name.push_str(name);

        let count = strategy.arena_count(&self.topology);
        let mut arenas = Vec::new();
        arenas
            .try_reserve_exact(count)
            .map_err(|_| KindError::MallocFailure)?;

        for slot in 0..count {
            match self.engine.register_arena(partition) {
                Ok(id) => arenas.push(id),
                Err(source) => {
                    warn!(
                        kind = name,
                        slot,
                        registered = arenas.len(),
                        error = %source,
                        "arena registration failed; rolling back kind"
                    );
                    self.purge_all(&arenas);
                    return Err(KindError::ArenaRegistrationFailure { slot, source });
                }
            }
        }

        debug!(
            kind = name,
            %strategy,
            %partition,
            arenas = arenas.len(),
            "kind created"
        );
        kind.install(LiveKind {
            name: owned_name,
            arenas: arenas.into_boxed_slice(),
            partition,
            strategy,
        });
        Ok(())
    }

    /// [`create`](Self::create) from a validated [`KindConfig`].
    pub fn create_from_config(
        &self,
        kind: &mut KindDescriptor,
        config: &KindConfig,
    ) -> Result<(), KindError> {
        config.validate()?;
        self.create(kind, config.strategy, config.partition, &config.name)
    }

    /// Purge the kind's arenas and release its name and arena map.
    ///
    /// Purge failures are logged and ignored. Destroying a descriptor that
    /// is already destroyed, or was never created, does nothing. Nothing
    /// here can fail, so there is no status to return; the C ABI reports
    /// only handle validity.
    pub fn destroy(&self, kind: &mut KindDescriptor) {
        let Some(live) = kind.take_live() else {
            return;
        };
        self.purge_all(&live.arenas);
        debug!(kind = %live.name, arenas = live.arenas.len(), "kind destroyed");
    }

    fn purge_all(&self, arenas: &[ArenaId]) {
        for &arena in arenas {
            if let Err(error) = self.engine.purge_arena(arena) {
                debug!(%arena, %error, "arena purge failed");
            }
        }
    }
}
