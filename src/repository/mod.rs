pub mod call_repository;
pub mod changes;
pub mod constituency_repository;
pub mod filters;
pub mod organization_repository;
pub mod record;
pub mod store;
pub mod user_repository;
pub mod voter_repository;

use std::sync::Arc;

use changes::ChangeHub;
use store::RecordStore;

#[derive(Clone)]
pub struct Repository {
    pub store: Arc<dyn RecordStore>,
    pub hub: Arc<ChangeHub>,
    pub users: user_repository::UserRepository,
    pub voters: voter_repository::VoterRepository,
    pub constituencies: constituency_repository::ConstituencyRepository,
    pub organizations: organization_repository::OrganizationRepository,
    pub calls: call_repository::CallRepository,
}

impl Repository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let hub = Arc::new(ChangeHub::new());
        Self {
            users: user_repository::UserRepository::new(store.clone(), hub.clone()),
            voters: voter_repository::VoterRepository::new(store.clone(), hub.clone()),
            constituencies: constituency_repository::ConstituencyRepository::new(
                store.clone(),
                hub.clone(),
            ),
            organizations: organization_repository::OrganizationRepository::new(
                store.clone(),
                hub.clone(),
            ),
            calls: call_repository::CallRepository::new(store.clone(), hub.clone()),
            store,
            hub,
        }
    }

    /// In-memory store for tests and offline runs.
    pub fn new_mock() -> Self {
        Self::new(Arc::new(store::mock::MockStore::new()))
    }
}
