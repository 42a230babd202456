use std::cmp::Ordering;

use crate::imports::*;

/*
    CONSTS:
    * OTHER_CATEGORY - Category used for sorting and grouping items without one
    * UNKNOWN_TYPE - Type used for sorting items without one
*/
pub const OTHER_CATEGORY: &str = "Other";
pub const UNKNOWN_TYPE: &str = "unknown";

/*
    Traits:
    * Filterable - What filtering, sorting and grouping read from an item

    Types:
    * SortKey - Explicit sort orders, the default order is the numeric `order` field
    * FilterOptions - Search, selections, sort and whether to group
    * CategoryGroup - One grouping bucket
*/
pub trait Filterable {
    fn header(&self) -> Option<&str>;
    fn field(&self) -> &str;
    fn category(&self) -> Option<&str>;
    fn type_name(&self) -> Option<&str>;
    fn order(&self) -> i64;
    fn is_fixed(&self) -> bool;

    // Header, or the field when no header is set
    fn label(&self) -> &str {
        match self.header() {
            Some(header) if !header.is_empty() => header,
            _ => self.field(),
        }
    }
}

impl Filterable for Parameter {
    fn header(&self) -> Option<&str> {
        Some(Parameter::header(self))
    }
    fn field(&self) -> &str {
        Parameter::field(self)
    }
    fn category(&self) -> Option<&str> {
        Parameter::category(self).filter(|c| !c.is_empty())
    }
    fn type_name(&self) -> Option<&str> {
        Some(self.type_label())
    }
    fn order(&self) -> i64 {
        Parameter::order(self)
    }
    fn is_fixed(&self) -> bool {
        Parameter::is_fixed(self)
    }
}

impl Filterable for ColumnDef {
    fn header(&self) -> Option<&str> {
        Some(&self.header)
    }
    fn field(&self) -> &str {
        &self.field
    }
    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| self.parameter.category().filter(|c| !c.is_empty()))
    }
    fn type_name(&self) -> Option<&str> {
        Some(self.parameter.type_label())
    }
    fn order(&self) -> i64 {
        self.order
    }
    fn is_fixed(&self) -> bool {
        self.parameter.is_fixed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Category,
    Type,
    Fixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOptions {
    pub(crate) search_term: String,
    pub(crate) selected_categories: Vec<String>,
    pub(crate) selected_types: Vec<String>,
    pub(crate) sort_by: Option<SortKey>,
    pub(crate) grouped: bool,
}

// Builder methods
impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort_by(&self) -> Option<SortKey> {
        self.sort_by
    }

    pub fn grouped(&self) -> bool {
        self.grouped
    }

    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = term.into();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort(mut self, sort_by: SortKey) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    pub fn with_grouped(mut self, grouped: bool) -> Self {
        self.grouped = grouped;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup<T> {
    pub category: String,
    pub items: Vec<T>,
}

fn matches_selection(selection: &[String], value: Option<&str>) -> bool {
    selection.is_empty() || value.is_some_and(|v| selection.iter().any(|s| s == v))
}

fn matches_search<T: Filterable>(item: &T, needle: &str) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        item.header().unwrap_or_default(),
        item.field(),
        item.category().unwrap_or_default(),
        item.type_name().unwrap_or_default()
    )
    .to_lowercase();
    haystack.contains(needle)
}

fn compare<T: Filterable>(a: &T, b: &T, sort_by: Option<SortKey>) -> Ordering {
    let by_order = || a.order().cmp(&b.order());
    match sort_by {
        None => by_order(),
        Some(SortKey::Name) => a.label().cmp(b.label()).then_with(by_order),
        Some(SortKey::Category) => a
            .category()
            .unwrap_or(OTHER_CATEGORY)
            .cmp(b.category().unwrap_or(OTHER_CATEGORY))
            .then_with(by_order),
        Some(SortKey::Type) => a
            .type_name()
            .unwrap_or(UNKNOWN_TYPE)
            .cmp(b.type_name().unwrap_or(UNKNOWN_TYPE))
            .then_with(by_order),
        // Fixed first
        Some(SortKey::Fixed) => b
            .is_fixed()
            .cmp(&a.is_fixed())
            .then_with(|| a.label().cmp(b.label()))
            .then_with(by_order),
    }
}

/// Applies the category, type and search filters, then sorts.
/// Empty selections keep everything.
pub fn filter_parameters<T: Filterable + Clone>(items: &[T], options: &FilterOptions) -> Vec<T> {
    let needle = options.search_term.to_lowercase();
    let mut filtered: Vec<T> = items
        .iter()
        .filter(|item| matches_selection(&options.selected_categories, item.category()))
        .filter(|item| matches_selection(&options.selected_types, item.type_name()))
        .filter(|item| needle.is_empty() || matches_search(*item, &needle))
        .cloned()
        .collect();
    filtered.sort_by(|a, b| compare(a, b, options.sort_by));

    tracing::debug!(
        input = items.len(),
        kept = filtered.len(),
        sort_by = ?options.sort_by,
        "Filtered items"
    );
    filtered
}

/// Buckets by category, items by `order` inside a bucket, buckets by name.
/// Returns no buckets unless `grouped` is set.
pub fn group_parameters<T: Filterable + Clone>(filtered: &[T], grouped: bool) -> Vec<CategoryGroup<T>> {
    if !grouped {
        return Vec::new();
    }
    let mut buckets: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in filtered {
        let category = item.category().unwrap_or(OTHER_CATEGORY).to_string();
        buckets.entry(category).or_default().push(item.clone());
    }
    buckets
        .into_iter()
        .map(|(category, mut items)| {
            items.sort_by_key(|item| item.order());
            CategoryGroup { category, items }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, category: Option<&str>, order: i64) -> Parameter {
        let parameter = Parameter::bim(name, name, ValueType::String, RawValue::Null).with_order(order);
        match category {
            Some(category) => parameter.with_category(category),
            None => parameter,
        }
    }

    fn names<T: Filterable>(items: &[T]) -> Vec<&str> {
        items.iter().map(|i| i.field()).collect()
    }

    fn sample() -> Vec<Parameter> {
        vec![
            param("Width", Some("Walls"), 2),
            param("Mark", None, 1),
            param("Area", Some("Floors"), 0),
            Parameter::from(UserParameter::fixed("u1", "Cost", 5.0.into()))
                .with_category("Walls")
                .with_order(3),
        ]
    }

    #[test]
    fn grouping_buckets_by_category() {
        let items = vec![
            param("b", Some("Walls"), 2),
            param("a", None, 1),
            param("c", Some("Walls"), 0),
        ];
        let groups = group_parameters(&items, true);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "Other");
        assert_eq!(names(&groups[0].items), vec!["a"]);
        assert_eq!(groups[1].category, "Walls");
        assert_eq!(names(&groups[1].items), vec!["c", "b"]);

        assert!(group_parameters(&items, false).is_empty());
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let filtered = filter_parameters(&sample(), &FilterOptions::new());
        assert_eq!(names(&filtered), vec!["Area", "Mark", "Width", "Cost"]);
    }

    #[test]
    fn category_and_type_selections_are_inclusive() {
        let options = FilterOptions::new().with_categories(["Walls"]);
        assert_eq!(names(&filter_parameters(&sample(), &options)), vec!["Width", "Cost"]);

        let options = FilterOptions::new().with_categories(["Walls"]).with_types(["fixed"]);
        assert_eq!(names(&filter_parameters(&sample(), &options)), vec!["Cost"]);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let options = FilterOptions::new().with_search_term("FLOOR");
        assert_eq!(names(&filter_parameters(&sample(), &options)), vec!["Area"]);

        let options = FilterOptions::new().with_search_term("fix");
        assert_eq!(names(&filter_parameters(&sample(), &options)), vec!["Cost"]);
    }

    #[test]
    fn search_term_is_not_trimmed() {
        let options = FilterOptions::new().with_search_term("string ");
        assert!(filter_parameters(&sample(), &options).is_empty());

        let options = FilterOptions::new().with_search_term("string");
        assert_eq!(names(&filter_parameters(&sample(), &options)), vec!["Area", "Mark", "Width"]);

        // Whitespace is a term like any other
        let options = FilterOptions::new().with_search_term("   ");
        assert!(filter_parameters(&sample(), &options).is_empty());

        let options = FilterOptions::new().with_search_term("walls string");
        assert_eq!(names(&filter_parameters(&sample(), &options)), vec!["Width"]);
    }

    #[test]
    fn empty_category_counts_as_missing() {
        let items = vec![param("a", Some(""), 0), param("b", None, 1), param("c", Some("Doors"), 2)];

        let groups = group_parameters(&items, true);
        let categories: Vec<&str> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, vec!["Doors", OTHER_CATEGORY]);
        assert_eq!(names(&groups[1].items), vec!["a", "b"]);

        let sorted = filter_parameters(&items, &FilterOptions::new().with_sort(SortKey::Category));
        assert_eq!(names(&sorted), vec!["c", "a", "b"]);

        let options = FilterOptions::new().with_categories([""]);
        assert!(filter_parameters(&items, &options).is_empty());

        let mut door = ColumnDef::from_parameter(param("d", Some("Doors"), 0), 0);
        door.category = Some(String::new());
        let blank = ColumnDef::from_parameter(param("e", Some(""), 1), 1);
        assert_eq!(Filterable::category(&door), Some("Doors"));
        assert_eq!(Filterable::category(&blank), None);
    }

    #[test]
    fn sort_orders() {
        let by = |key| names(&filter_parameters(&sample(), &FilterOptions::new().with_sort(key)))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        assert_eq!(by(SortKey::Name), vec!["Area", "Cost", "Mark", "Width"]);
        // Missing category sorts as "Other"
        assert_eq!(by(SortKey::Category), vec!["Area", "Mark", "Width", "Cost"]);
        assert_eq!(by(SortKey::Type), vec!["Cost", "Area", "Mark", "Width"]);
        assert_eq!(by(SortKey::Fixed), vec!["Cost", "Area", "Mark", "Width"]);
    }

    #[test]
    fn columns_filter_like_parameters() {
        let columns = vec![
            ColumnDef::fixed("id", "ID", 0),
            ColumnDef::from_parameter(param("Width", Some("Walls"), 0), 1),
        ];
        let options = FilterOptions::new().with_categories(["Walls"]);
        assert_eq!(names(&filter_parameters(&columns, &options)), vec!["Width"]);
    }

    #[test]
    fn options_load_from_json() {
        let options: FilterOptions = serde_json::from_value(serde_json::json!({
            "searchTerm": "mark",
            "sortBy": "category",
            "grouped": true
        }))
        .unwrap();
        assert_eq!(options.sort_by(), Some(SortKey::Category));
        assert!(options.grouped());
        assert_eq!(options.search_term(), "mark");
    }
}
