pub mod box_select;
pub mod brush;
pub mod labeling;
