// crates/settings-provider-core/src/runtime/provider.rs
// ============================================================================
// Module: Settings Provider
// Description: In-process settings service over routed per-user stores.
// Purpose: Expose query, mutation, type and call entry points.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`SettingsProvider`] is the single entry point callers use. Each request is
//! resolved by the [`Router`], checked for permission, dispatched to the
//! owning user's [`TableStore`](crate::runtime::TableStore) and, once the
//! mutation commits with a non-zero affected count, announced through the
//! [`ChangeNotifier`].
//!
//! ## Invariants
//! - Permission and validation checks run before any storage work.
//! - Change notifications are never sent for failed or empty mutations.
//! - Global requests always land in the primordial user's store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Weak;

use tracing::debug;
use tracing::warn;

use crate::core::Caller;
use crate::core::Column;
use crate::core::DEFAULT_MAX_USER_ID;
use crate::core::Lookup;
use crate::core::Namespace;
use crate::core::Predicate;
use crate::core::ResourceType;
use crate::core::RowSet;
use crate::core::RowUpdate;
use crate::core::RowValues;
use crate::core::Selection;
use crate::core::SettingRow;
use crate::core::SettingsError;
use crate::core::SettingsUri;
use crate::core::SortOrder;
use crate::core::UserId;
use crate::core::ValidatorRegistry;
use crate::interfaces::ChangeBus;
use crate::interfaces::DefaultSetting;
use crate::interfaces::LegacySettingsSource;
use crate::interfaces::PermissionOracle;
use crate::interfaces::ProviderStateStore;
use crate::interfaces::StorageEngine;
use crate::interfaces::UserDirectory;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::MutationAuditEvent;
use crate::runtime::audit::MutationAuditEventParams;
use crate::runtime::audit::MutationOperation;
use crate::runtime::manager::StoreManager;
use crate::runtime::migration::LegacyKeys;
use crate::runtime::migration::MigrationEngine;
use crate::runtime::migration::MigrationOutcome;
use crate::runtime::migration::MigrationReport;
use crate::runtime::migration::MigrationSink;
use crate::runtime::notifier::ChangeNotifier;
use crate::runtime::router::PermissionNames;
use crate::runtime::router::Router;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Provider policy inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Checked permission names.
    pub permissions: PermissionNames,
    /// Largest accepted user handle.
    pub max_user_id: u32,
    /// Rows loaded into new stores.
    pub defaults: Vec<DefaultSetting>,
    /// System namespace validators.
    pub validators: ValidatorRegistry,
    /// Legacy keys copied by migration.
    pub legacy_keys: LegacyKeys,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            permissions: PermissionNames::default(),
            max_user_id: DEFAULT_MAX_USER_ID,
            defaults: Vec::new(),
            validators: ValidatorRegistry::new(),
            legacy_keys: LegacyKeys::default(),
        }
    }
}

/// External collaborators consumed by the provider.
pub struct ProviderCollaborators {
    /// Per-user storage engine.
    pub engine: Arc<dyn StorageEngine>,
    /// Persisted migration flag and change versions.
    pub state: Arc<dyn ProviderStateStore>,
    /// Authorization oracle.
    pub permissions: Arc<dyn PermissionOracle>,
    /// Change broadcast.
    pub bus: Arc<dyn ChangeBus>,
    /// Known users and removals.
    pub directory: Arc<dyn UserDirectory>,
    /// Pre-migration values.
    pub legacy: Arc<dyn LegacySettingsSource>,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
}

// ============================================================================
// SECTION: Call Surface
// ============================================================================

/// Administrative call methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMethod {
    /// Read one value.
    Get(Namespace),
    /// Write one value.
    Put(Namespace),
    /// Run the one-time migration pass.
    MigrateSettings,
    /// Migrate one user.
    MigrateSettingsForUser,
}

impl CallMethod {
    /// Parses a method name such as `GET_secure` or `migrate_settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidArgument`] for unknown methods.
    pub fn parse(method: &str) -> Result<Self, SettingsError> {
        if let Some(namespace) = method.strip_prefix("GET_").and_then(Namespace::parse) {
            return Ok(Self::Get(namespace));
        }
        if let Some(namespace) = method.strip_prefix("PUT_").and_then(Namespace::parse) {
            return Ok(Self::Put(namespace));
        }
        match method {
            "migrate_settings" => Ok(Self::MigrateSettings),
            "migrate_settings_for_user" => Ok(Self::MigrateSettingsForUser),
            _ => Err(SettingsError::InvalidArgument(format!("unknown call method: {method}"))),
        }
    }
}

/// Optional call arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs {
    /// Target user; defaults to the caller's user.
    pub user: Option<UserId>,
    /// Value for put calls.
    pub value: Option<String>,
}

/// Call result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResponse {
    /// Nothing to return.
    Empty,
    /// Single-value lookup result.
    Setting(Lookup),
    /// Full migration pass result.
    Migration(MigrationOutcome),
    /// Single-user migration result.
    UserMigration(MigrationReport),
}

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Multi-user settings provider.
pub struct SettingsProvider {
    /// Request router.
    router: Router,
    /// Per-user stores.
    stores: StoreManager,
    /// Change notifier.
    notifier: ChangeNotifier,
    /// Migration engine.
    migration: MigrationEngine,
    /// System validators.
    validators: ValidatorRegistry,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
}

impl SettingsProvider {
    /// Builds the provider, opens the primordial user's store and subscribes
    /// to user removals.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the primordial store
    /// cannot be opened.
    pub fn start(
        config: ProviderConfig,
        collaborators: ProviderCollaborators,
    ) -> Result<Arc<Self>, SettingsError> {
        let ProviderCollaborators {
            engine,
            state,
            permissions,
            bus,
            directory,
            legacy,
            audit,
        } = collaborators;
        let provider = Arc::new(Self {
            router: Router::new(permissions, config.permissions, Arc::clone(&audit)),
            stores: StoreManager::new(engine, config.defaults, config.max_user_id),
            notifier: ChangeNotifier::new(Arc::clone(&state), bus),
            migration: MigrationEngine::new(
                state,
                Arc::clone(&directory),
                legacy,
                config.legacy_keys,
                Arc::clone(&audit),
            ),
            validators: config.validators,
            audit,
        });
        provider.stores.get_or_create(UserId::PRIMORDIAL)?;
        let weak: Weak<Self> = Arc::downgrade(&provider);
        directory.subscribe_removals(Box::new(move |user| {
            if let Some(provider) = weak.upgrade() {
                provider.on_user_removed(user);
            }
        }));
        Ok(provider)
    }

    /// Returns the store manager.
    #[must_use]
    pub const fn store_manager(&self) -> &StoreManager {
        &self.stores
    }

    /// Returns `namespace`'s change version.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when it cannot be read.
    pub fn change_version(&self, namespace: Namespace) -> Result<u64, SettingsError> {
        self.notifier.version(namespace)
    }

    /// Evicts a removed user's cached store.
    pub fn on_user_removed(&self, user: UserId) {
        if let Err(err) = self.stores.evict(user) {
            warn!(user = %user, error = %err, "failed to evict removed user store");
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns rows of the identified namespace (or item) for the caller.
    ///
    /// Item identifiers ignore `selection`. An empty projection selects every
    /// column.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for bad identifiers, unbindable selections or
    /// storage failures.
    pub fn query(
        &self,
        caller: &Caller,
        identifier: &str,
        projection: &[Column],
        selection: &Selection,
        sort: Option<&SortOrder>,
    ) -> Result<RowSet, SettingsError> {
        let uri = Router::resolve(identifier)?;
        let namespace = uri.namespace();
        let predicate = match uri.item_name() {
            Some(item) => Some(Predicate::name_equals(item)),
            None => selection.bind()?,
        };
        let columns = if projection.is_empty() { Column::ALL.to_vec() } else { projection.to_vec() };
        let store = self.stores.get_or_create(Router::route_user(namespace, caller.user_id()))?;
        let rows = store.table(namespace)?.query(predicate.as_ref(), &columns, sort)?;
        Ok(RowSet {
            columns,
            rows,
            notification_uri: uri,
            notification_user: caller.user_id(),
        })
    }

    /// Returns the type descriptor of an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidIdentifier`] for unknown patterns.
    pub fn get_type(&self, identifier: &str) -> Result<ResourceType, SettingsError> {
        Ok(Router::resolve(identifier)?.resource_type())
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Inserts (or replaces) one row; returns the inserted item's identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for bad identifiers, malformed rows, missing
    /// permission, failed validation or storage failures.
    pub fn insert(
        &self,
        caller: &Caller,
        identifier: &str,
        values: &RowValues,
    ) -> Result<SettingsUri, SettingsError> {
        let uri = collection_of(Router::resolve(identifier)?, identifier)?;
        let namespace = uri.namespace();
        let row = SettingRow::try_from(values)?;
        self.router.check_write_permission(namespace, caller)?;
        self.validate(namespace, Some(&row.name), row.value.as_deref())?;
        let user = Router::route_user(namespace, caller.user_id());
        let store = self.stores.get_or_create(user)?;
        let id = store.table(namespace)?.insert_row(&row)?;
        let item = uri.with_item(row.name);
        debug!(namespace = %namespace, user = %user, row_id = id, "inserted setting");
        self.committed(MutationOperation::Insert, caller, user, &item, 1);
        Ok(item)
    }

    /// Inserts all rows or none; returns the inserted count (0 on failure).
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for bad identifiers, an empty batch or missing
    /// permission. Row and storage failures report 0 instead.
    pub fn bulk_insert(
        &self,
        caller: &Caller,
        identifier: &str,
        rows: &[RowValues],
    ) -> Result<usize, SettingsError> {
        let uri = collection_of(Router::resolve(identifier)?, identifier)?;
        self.bulk_insert_into(caller, &uri, rows)
    }

    /// Updates matching rows; returns the updated count.
    ///
    /// Item identifiers narrow the update to that item.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for bad identifiers, malformed values, missing
    /// permission, failed validation or storage failures.
    pub fn update(
        &self,
        caller: &Caller,
        identifier: &str,
        values: &RowValues,
        selection: &Selection,
    ) -> Result<usize, SettingsError> {
        let uri = Router::resolve(identifier)?;
        let namespace = uri.namespace();
        let update = RowUpdate::try_from(values)?;
        self.router.check_write_permission(namespace, caller)?;
        self.validate(namespace, values.name(), values.value())?;
        let predicate = match uri.item_name() {
            Some(item) => Some(narrow(item, selection)?),
            None => selection.bind()?,
        };
        let user = Router::route_user(namespace, caller.user_id());
        let store = self.stores.get_or_create(user)?;
        let count = store.table(namespace)?.update(&update, predicate.as_ref())?;
        self.committed(MutationOperation::Update, caller, user, &uri, count);
        Ok(count)
    }

    /// Deletes matching rows; returns the deleted count.
    ///
    /// A collection delete without both a filter and arguments deletes
    /// nothing. Item identifiers delete that item.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for bad identifiers, missing permission,
    /// unbindable selections or storage failures.
    pub fn delete(
        &self,
        caller: &Caller,
        identifier: &str,
        selection: &Selection,
    ) -> Result<usize, SettingsError> {
        let uri = Router::resolve(identifier)?;
        let namespace = uri.namespace();
        self.router.check_write_permission(namespace, caller)?;
        let predicate = match uri.item_name() {
            Some(item) => Some(narrow(item, selection)?),
            None if selection.is_unbound() => None,
            None => selection.bind()?,
        };
        let user = Router::route_user(namespace, caller.user_id());
        let store = self.stores.get_or_create(user)?;
        let count = store.table(namespace)?.delete(predicate.as_ref())?;
        self.committed(MutationOperation::Delete, caller, user, &uri, count);
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------------

    /// Runs an administrative call.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for unknown methods, missing keys, missing
    /// permission, failed validation, storage or migration failures.
    pub fn call(
        &self,
        caller: &Caller,
        method: &str,
        key: Option<&str>,
        args: &CallArgs,
    ) -> Result<CallResponse, SettingsError> {
        let method = CallMethod::parse(method)?;
        let target = args.user.unwrap_or_else(|| caller.user_id());
        match method {
            CallMethod::Get(namespace) => {
                let key = required_key(key)?;
                self.router.check_cross_user(caller, target)?;
                let store = self.stores.get_or_create(Router::route_user(namespace, target))?;
                Ok(CallResponse::Setting(store.table(namespace)?.get(key)?))
            }
            CallMethod::Put(namespace) => {
                let key = required_key(key)?;
                self.router.check_cross_user(caller, target)?;
                self.router.check_put_permission(namespace, caller)?;
                self.router.check_write_permission(namespace, caller)?;
                let value = args.value.as_deref();
                self.validate(namespace, Some(key), value)?;
                let user = Router::route_user(namespace, target);
                let store = self.stores.get_or_create(user)?;
                store.table(namespace)?.insert_or_replace(key, value)?;
                let item = SettingsUri::item(namespace, key);
                self.committed(MutationOperation::Put, caller, user, &item, 1);
                Ok(CallResponse::Empty)
            }
            CallMethod::MigrateSettings => {
                Ok(CallResponse::Migration(self.migrate_if_needed()?))
            }
            CallMethod::MigrateSettingsForUser => {
                self.router.check_cross_user(caller, target)?;
                Ok(CallResponse::UserMigration(self.migrate_user(target)?))
            }
        }
    }

    /// Runs the one-time migration pass unless it already completed.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when any user fails to migrate.
    pub fn migrate_if_needed(&self) -> Result<MigrationOutcome, SettingsError> {
        self.migration.migrate_if_needed(self)
    }

    /// Returns true once the one-time migration pass has completed.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::StorageFailure`] when the flag cannot be read.
    pub fn is_migrated(&self) -> Result<bool, SettingsError> {
        self.migration.is_complete()
    }

    /// Migrates one user's legacy values.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the user fails to migrate.
    pub fn migrate_user(&self, user: UserId) -> Result<MigrationReport, SettingsError> {
        self.migration.migrate_user(user, self)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Bulk insert into a resolved collection.
    fn bulk_insert_into(
        &self,
        caller: &Caller,
        uri: &SettingsUri,
        rows: &[RowValues],
    ) -> Result<usize, SettingsError> {
        if rows.is_empty() {
            return Err(SettingsError::InvalidArgument("bulk insert requires rows".to_string()));
        }
        let namespace = uri.namespace();
        self.router.check_write_permission(namespace, caller)?;
        let user = Router::route_user(namespace, caller.user_id());
        let store = self.stores.get_or_create(user)?;
        let count = store.table(namespace)?.bulk_insert(rows);
        self.committed(MutationOperation::BulkInsert, caller, user, uri, count);
        Ok(count)
    }

    /// Runs System validation; other namespaces are unvalidated.
    fn validate(
        &self,
        namespace: Namespace,
        name: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), SettingsError> {
        match namespace {
            Namespace::System => self.validators.check(name, value),
            Namespace::Secure | Namespace::Global => Ok(()),
        }
    }

    /// Notifies and audits a committed mutation that affected rows.
    fn committed(
        &self,
        operation: MutationOperation,
        caller: &Caller,
        user: UserId,
        uri: &SettingsUri,
        affected_rows: usize,
    ) {
        if affected_rows == 0 {
            return;
        }
        let namespace = uri.namespace();
        let notice = self.notifier.notify(namespace, user, uri);
        self.audit.record_mutation(&MutationAuditEvent::new(MutationAuditEventParams {
            operation,
            namespace,
            user,
            caller: caller.label(),
            affected_rows,
            change_version: notice.version,
        }));
    }
}

impl MigrationSink for SettingsProvider {
    fn bulk_insert_for_user(
        &self,
        user: UserId,
        namespace: Namespace,
        rows: &[RowValues],
    ) -> Result<usize, SettingsError> {
        self.bulk_insert_into(&Caller::internal(user), &SettingsUri::collection(namespace), rows)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Requires a collection identifier.
fn collection_of(uri: SettingsUri, identifier: &str) -> Result<SettingsUri, SettingsError> {
    if uri.is_item() {
        return Err(SettingsError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(uri)
}

/// Predicate selecting `item`, narrowed further by the caller's filter.
fn narrow(item: &str, selection: &Selection) -> Result<Predicate, SettingsError> {
    let predicate = Predicate::name_equals(item);
    Ok(match selection.bind()? {
        Some(filter) => predicate.and(filter),
        None => predicate,
    })
}

/// Requires a non-empty call key.
fn required_key(key: Option<&str>) -> Result<&str, SettingsError> {
    match key {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(SettingsError::InvalidArgument("call requires a setting name".to_string())),
    }
}
