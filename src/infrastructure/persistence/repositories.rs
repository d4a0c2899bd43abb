mod observation_repository;

pub use observation_repository::SqliteObservationRepository;
