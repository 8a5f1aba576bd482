//! Display names for chapter and subchapter codes.
//!
//! Paragraph-level names come from the classification tables through the
//! aggregated rows instead.

use super::Dimension;

const FUNCTIONAL_CHAPTERS: &[(&str, &str)] = &[
    ("01", "Corporate income tax"),
    ("03", "Income, profit and capital gains taxes"),
    ("04", "Shares and amounts deducted from income tax"),
    ("07", "Property taxes"),
    ("11", "Amounts deducted from value added tax"),
    ("12", "Value added tax"),
    ("15", "Taxes on specific services"),
    ("16", "Taxes on the use of goods and on permits"),
    ("18", "Other taxes and fees"),
    ("30", "Property income"),
    ("33", "Income from services"),
    ("34", "Income from education and other activities"),
    ("35", "Fines, penalties and confiscations"),
    ("36", "Miscellaneous income"),
    ("37", "Transfers"),
    ("39", "Capital income"),
    ("42", "Subsidies from the state budget"),
    ("43", "Subsidies from other administrations"),
    ("48", "Amounts received from the European Union"),
    ("51", "Public authorities and external actions"),
    ("54", "Other general public services"),
    ("55", "Public debt transactions"),
    ("56", "Transfers between levels of government"),
    ("60", "Defence"),
    ("61", "Public order and national security"),
    ("65", "Education"),
    ("66", "Health"),
    ("67", "Culture, recreation and religion"),
    ("68", "Social insurance and assistance"),
    ("70", "Housing, services and public development"),
    ("74", "Environmental protection"),
    ("80", "General economic, commercial and labour affairs"),
    ("81", "Fuel and energy"),
    ("83", "Agriculture, forestry, fishing and hunting"),
    ("84", "Transport"),
    ("87", "Other economic affairs"),
];

const FUNCTIONAL_SUBCHAPTERS: &[(&str, &str)] = &[
    ("5103", "Executive and legislative authorities"),
    ("5401", "Reserve funds"),
    ("5410", "General services"),
    ("6503", "Pre-school and primary education"),
    ("6504", "Secondary education"),
    ("6505", "Post-secondary education"),
    ("6506", "Higher education"),
    ("6507", "Education not definable by level"),
    ("6511", "Auxiliary education services"),
    ("6550", "Other education expenses"),
    ("6603", "Medical products, equipment and devices"),
    ("6604", "Outpatient services"),
    ("6606", "Hospital services"),
    ("6608", "Public health services"),
    ("6650", "Other health expenses"),
    ("6703", "Cultural services"),
    ("6705", "Recreational and sports services"),
    ("6706", "Religious services"),
    ("6750", "Other culture, recreation and religion expenses"),
    ("6805", "Social assistance for the family and children"),
    ("6811", "Nursery services"),
    ("6815", "Social assistance for persons with disabilities"),
    ("6850", "Other social assistance expenses"),
    ("7003", "Housing"),
    ("7005", "Water supply"),
    ("7006", "Public lighting and electrification"),
    ("7050", "Other housing and public development expenses"),
    ("7403", "Pollution abatement"),
    ("7405", "Sanitation and waste management"),
    ("7406", "Sewerage and wastewater treatment"),
    ("8403", "Road transport"),
    ("8404", "Rail transport"),
    ("8406", "Air transport"),
];

const ECONOMIC_CHAPTERS: &[(&str, &str)] = &[
    ("10", "Personnel expenses"),
    ("20", "Goods and services"),
    ("30", "Interest"),
    ("40", "Subsidies"),
    ("50", "Reserve funds"),
    ("51", "Transfers between public administration units"),
    ("55", "Other transfers"),
    ("56", "Projects with external non-reimbursable funding"),
    ("57", "Social assistance"),
    ("58", "Projects financed from post-accession funds"),
    ("59", "Other expenses"),
    ("60", "Projects financed from recovery funds"),
    ("70", "Capital expenses"),
    ("71", "Non-financial assets"),
    ("72", "Financial assets"),
    ("79", "Financial operations"),
    ("81", "Loan repayments"),
    ("84", "Payments made in previous years and recovered"),
];

const ECONOMIC_SUBCHAPTERS: &[(&str, &str)] = &[
    ("1001", "Wages in cash"),
    ("1002", "Wages in kind"),
    ("1003", "Personnel contributions"),
    ("2001", "Goods and services"),
    ("2002", "Current repairs"),
    ("2005", "Inventory items"),
    ("2006", "Travel and secondments"),
    ("2030", "Other goods and services"),
    ("3001", "Interest on internal public debt"),
    ("3002", "Interest on external public debt"),
    ("4001", "Subsidies for public companies"),
    ("5101", "Current transfers between administrations"),
    ("5102", "Capital transfers between administrations"),
    ("5501", "Internal transfers"),
    ("5702", "Social assistance in cash"),
    ("5901", "Scholarships"),
    ("5940", "Associations and foundations"),
    ("7101", "Fixed assets"),
    ("7103", "Land and other tangible assets"),
    ("8101", "Internal loan repayments"),
    ("8102", "External loan repayments"),
];

/// Static name for a chapter (2 digit) or subchapter (4 digit) code.
pub fn label(dimension: Dimension, code: &str) -> Option<&'static str> {
    let table = match (dimension, code.len()) {
        (Dimension::Functional, 2) => FUNCTIONAL_CHAPTERS,
        (Dimension::Functional, 4) => FUNCTIONAL_SUBCHAPTERS,
        (Dimension::Economic, 2) => ECONOMIC_CHAPTERS,
        (Dimension::Economic, 4) => ECONOMIC_SUBCHAPTERS,
        _ => return None,
    };
    table
        .binary_search_by(|(c, _)| c.cmp(&code))
        .ok()
        .map(|i| table[i].1)
}
