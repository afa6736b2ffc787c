use tabled::{
    Table,
    settings::{Alignment, Style, object::Rows},
};

/// Common styling for all tables printed by this tool
pub(crate) trait BathroomctlTable {
    fn styled(&mut self) -> &mut Self;
}

impl BathroomctlTable for Table {
    fn styled(&mut self) -> &mut Self {
        self.with(Style::psql())
            .modify(Rows::first(), Alignment::center())
    }
}
