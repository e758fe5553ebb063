//! # Registrant Model Module
//!
//! The registrant record (one store row per user), the store columns and the
//! mapping from columns to row positions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value stored in the location column when the user shares nothing usable
pub const LOCATION_NOT_SHARED: &str = "Not shared";

/// Value stored in the username column for users without a public handle
pub const USERNAME_NOT_SET: &str = "Not set";

/// Separator used to store link lists in a single cell
pub const LINK_SEPARATOR: &str = ", ";

/// Columns of the backing store, in the standard sheet layout order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    UserId,
    Username,
    FullName,
    Profession,
    Phone,
    Location,
    RegionCityWoreda,
    ConfirmDelete,
    Comment,
    Testimonials,
    EducationalDocs,
}

impl Column {
    /// All columns in standard layout order (A..K)
    pub const ALL: [Column; 11] = [
        Column::UserId,
        Column::Username,
        Column::FullName,
        Column::Profession,
        Column::Phone,
        Column::Location,
        Column::RegionCityWoreda,
        Column::ConfirmDelete,
        Column::Comment,
        Column::Testimonials,
        Column::EducationalDocs,
    ];

    /// Header text used in the store's first row
    pub fn header(self) -> &'static str {
        match self {
            Column::UserId => "User ID",
            Column::Username => "Username",
            Column::FullName => "Full_Name",
            Column::Profession => "PROFESSION",
            Column::Phone => "PHONE",
            Column::Location => "LOCATION",
            Column::RegionCityWoreda => "Region/City/Woreda",
            Column::ConfirmDelete => "CONFIRM_DELETE",
            Column::Comment => "COMMENT",
            Column::Testimonials => "Testimonials",
            Column::EducationalDocs => "Educational Docs",
        }
    }
}

/// Header row for a store using the standard layout
pub fn standard_header() -> Vec<String> {
    Column::ALL.iter().map(|c| c.header().to_string()).collect()
}

/// Maps each column to its 0-based position in a store row
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnMap {
    positions: HashMap<Column, usize>,
    width: usize,
}

impl ColumnMap {
    /// The A..K layout the bot writes when it owns the sheet
    pub fn standard() -> Self {
        let positions = Column::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, i))
            .collect();
        Self {
            positions,
            width: Column::ALL.len(),
        }
    }

    /// Build the map from a header row. Header matching ignores case and
    /// surrounding whitespace; unknown headers are skipped.
    pub fn from_header(header: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (i, name) in header.iter().enumerate() {
            let name = name.trim();
            if let Some(column) = Column::ALL
                .iter()
                .find(|c| c.header().eq_ignore_ascii_case(name))
            {
                positions.entry(*column).or_insert(i);
            }
        }
        Self {
            positions,
            width: header.len(),
        }
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn contains(&self, column: Column) -> bool {
        self.positions.contains_key(&column)
    }

    /// Number of cells in a full row
    pub fn width(&self) -> usize {
        self.width
    }

    /// Cell text for `column` in `row`, empty when missing
    pub fn cell<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        self.position(column)
            .and_then(|i| row.get(i))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::standard()
    }
}

/// One registered professional
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Registrant {
    pub user_id: u64,
    pub username: String,
    pub full_name: String,
    pub profession: String,
    pub phone: String,
    pub location: String,
    pub region_city_woreda: String,
    pub comment: String,
    pub testimonial_links: Vec<String>,
    pub education_links: Vec<String>,
}

impl Registrant {
    /// Encode the record as a full store row
    pub fn to_row(&self, columns: &ColumnMap) -> Vec<String> {
        let mut row = vec![String::new(); columns.width()];
        for column in Column::ALL {
            if let Some(i) = columns.position(column) {
                row[i] = self.value(column);
            }
        }
        row
    }

    /// Decode a store row. Returns `None` when the user id cell is not a
    /// platform identifier (blank or foreign rows).
    pub fn from_row(columns: &ColumnMap, row: &[String]) -> Option<Self> {
        let user_id = columns.cell(row, Column::UserId).trim().parse().ok()?;
        Some(Self {
            user_id,
            username: columns.cell(row, Column::Username).to_string(),
            full_name: columns.cell(row, Column::FullName).to_string(),
            profession: columns.cell(row, Column::Profession).to_string(),
            phone: columns.cell(row, Column::Phone).to_string(),
            location: columns.cell(row, Column::Location).to_string(),
            region_city_woreda: columns.cell(row, Column::RegionCityWoreda).to_string(),
            comment: columns.cell(row, Column::Comment).to_string(),
            testimonial_links: split_links(columns.cell(row, Column::Testimonials)),
            education_links: split_links(columns.cell(row, Column::EducationalDocs)),
        })
    }

    /// Cell value for a single column
    pub fn value(&self, column: Column) -> String {
        match column {
            Column::UserId => self.user_id.to_string(),
            Column::Username => self.username.clone(),
            Column::FullName => self.full_name.clone(),
            Column::Profession => self.profession.clone(),
            Column::Phone => self.phone.clone(),
            Column::Location => self.location.clone(),
            Column::RegionCityWoreda => self.region_city_woreda.clone(),
            Column::ConfirmDelete => String::new(),
            Column::Comment => self.comment.clone(),
            Column::Testimonials => join_links(&self.testimonial_links),
            Column::EducationalDocs => join_links(&self.education_links),
        }
    }
}

/// Join links into the single-cell representation
pub fn join_links(links: &[String]) -> String {
    links.join(LINK_SEPARATOR)
}

/// Split a link cell back into its ordered list
pub fn split_links(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Registrant {
        Registrant {
            user_id: 42,
            username: "abebe".to_string(),
            full_name: "Abebe Kebede".to_string(),
            profession: "Civil Engineer".to_string(),
            phone: "+251911123456".to_string(),
            location: LOCATION_NOT_SHARED.to_string(),
            region_city_woreda: "Addis Ababa, Bole, 03".to_string(),
            comment: String::new(),
            testimonial_links: vec!["https://a".to_string(), "https://b".to_string()],
            education_links: vec![],
        }
    }

    #[test]
    fn test_standard_layout_positions() {
        let map = ColumnMap::standard();
        assert_eq!(map.position(Column::UserId), Some(0));
        assert_eq!(map.position(Column::FullName), Some(2));
        assert_eq!(map.position(Column::Comment), Some(8));
        assert_eq!(map.position(Column::EducationalDocs), Some(10));
        assert_eq!(map.width(), 11);
    }

    #[test]
    fn test_row_encoding_matches_sheet_layout() {
        let row = sample().to_row(&ColumnMap::standard());
        assert_eq!(row[0], "42");
        assert_eq!(row[6], "Addis Ababa, Bole, 03");
        assert_eq!(row[7], "");
        assert_eq!(row[9], "https://a, https://b");
        assert_eq!(row[10], "");
    }

    #[test]
    fn test_row_decoding_restores_record() {
        let map = ColumnMap::standard();
        let decoded = Registrant::from_row(&map, &sample().to_row(&map)).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_short_rows_decode_with_empty_cells() {
        let map = ColumnMap::standard();
        let decoded = Registrant::from_row(&map, &["7".to_string(), "x".to_string()]).unwrap();
        assert_eq!(decoded.user_id, 7);
        assert!(decoded.full_name.is_empty());
        assert!(decoded.education_links.is_empty());
    }

    #[test]
    fn test_rows_without_user_id_are_skipped() {
        let map = ColumnMap::standard();
        assert!(Registrant::from_row(&map, &["".to_string()]).is_none());
        assert!(Registrant::from_row(&map, &["abc".to_string()]).is_none());
    }

    #[test]
    fn test_header_matching_is_case_insensitive() {
        let header: Vec<String> = ["user id", " Full_Name ", "phone", "Unrelated"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let map = ColumnMap::from_header(&header);
        assert_eq!(map.position(Column::UserId), Some(0));
        assert_eq!(map.position(Column::FullName), Some(1));
        assert_eq!(map.position(Column::Phone), Some(2));
        assert!(!map.contains(Column::Comment));
        assert_eq!(map.width(), 4);
    }
}
