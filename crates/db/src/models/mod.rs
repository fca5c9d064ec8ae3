pub mod board;
pub mod brand;
pub mod ids;
pub mod note;
pub mod project;
pub mod risk;
pub mod work_order;
