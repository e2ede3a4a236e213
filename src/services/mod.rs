// Business logic services

pub mod data_processing_service;
pub mod feature_engineering_service;
pub mod ml_model_service;
pub mod model_training_service;
pub mod model_versioning_service;

pub use data_processing_service::DataProcessingService;
pub use feature_engineering_service::FeatureEngineeringService;
pub use ml_model_service::MLModelService;
pub use model_training_service::ModelTrainingService;
pub use model_versioning_service::ModelVersioningService;
