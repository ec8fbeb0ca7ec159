pub mod advice;
pub mod component_extractor;
pub mod composition;
pub mod coordinate_mapper;
pub mod mask;
pub mod region;
