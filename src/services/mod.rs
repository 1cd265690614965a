pub mod ai_service;
pub mod context_service;
pub mod export_service;
pub mod generation_service;
pub mod prompt_service;
pub mod reference_service;
pub mod validation_service;
