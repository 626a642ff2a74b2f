//! Search query generation for one researched person.

/// Build the search queries for `person_name` across `terms`.
///
/// Individuals are searched as an exact phrase (`"Name" term`). With the
/// large-company hint the name is left unquoted, which broadens matching for
/// organizations whose names are common words. An alternate name is always
/// quoted. Primary-name queries come first, then alternate-name queries, each
/// in `terms` order.
pub fn build_queries(
    person_name: &str,
    terms: &[String],
    alternate_name: Option<&str>,
    large_company: bool,
) -> Vec<String> {
    let primary = terms.iter().map(|term| {
        if large_company {
            format!("{} {}", person_name, term)
        } else {
            format!("\"{}\" {}", person_name, term)
        }
    });

    let alternate = alternate_name
        .into_iter()
        .flat_map(|alt| terms.iter().map(move |term| format!("\"{}\" {}", alt, term)));

    primary.chain(alternate).collect()
}
