#![deny(unsafe_code)]

pub mod country;
pub mod normalized;
pub mod state;
pub mod tables;
pub mod year;

pub use country::{
    normalize_country_area, normalize_country_hospital, normalize_country_shape,
    normalize_country_temperature, normalize_malaria_death, normalize_malaria_incidence,
};
pub use normalized::Normalized;
pub use state::{
    normalize_state_area, normalize_state_gdp, normalize_state_hospital,
    normalize_state_population, normalize_state_shape, normalize_state_temperature,
};
pub use tables::{CountryTables, StateTables, normalize_countries, normalize_states};
pub use year::{parse_year_cell, parse_year_label, year_of_date};

#[cfg(test)]
pub(crate) mod test_support {
    use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};

    /// Builds a frame of nullable string columns, as the CSV reader does.
    pub(crate) fn frame(columns: &[(&str, &[&str])]) -> DataFrame {
        let columns: Vec<Column> = columns
            .iter()
            .map(|(name, values)| {
                let values: Vec<Option<String>> = values
                    .iter()
                    .map(|v| (!v.is_empty()).then(|| (*v).to_string()))
                    .collect();
                Series::new((*name).into(), values).into_column()
            })
            .collect();
        DataFrame::new(columns).expect("test frame")
    }
}
