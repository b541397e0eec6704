//! Tests for compiling filters and composing the event data values query.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use similar_asserts::assert_eq;
use uuid::Uuid;

use query_engine_sql::sql::dialect::Dialect;
use query_engine_translation::translation::error::{Error, FilterValidationError};
use query_engine_translation::translation::filters::{
    Filter, FilterKind, FilterOperator, QueryFilters,
};
use query_engine_translation::translation::query::event_data_values::{self, ROW_LIMIT};
use query_engine_translation::translation::query::filtering::{
    parse_columnar_filters, parse_filters, parse_relational_filters,
};

const DIALECTS: [Dialect; 2] = [Dialect::Postgresql, Dialect::Clickhouse];

fn website_id() -> Uuid {
    Uuid::parse_str("02d89813-a1cf-4a5d-8a0e-0b8c5b5a1f8e").unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn t1() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap()
}

fn names<'a>(names: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    names.map(str::to_string).collect()
}

#[test]
fn property_name_alone_adds_one_predicate() {
    let filters = QueryFilters::new(t0(), t1()).with_property_name("plan");

    let relational = parse_relational_filters(website_id(), &filters).unwrap();
    insta::assert_snapshot!(relational.filter_query, @"and event_data.data_key = {{propertyName}}");

    let columnar = parse_columnar_filters(website_id(), &filters).unwrap();
    insta::assert_snapshot!(columnar.filter_query, @"and data_key = {propertyName:String}");

    for compiled in [relational, columnar] {
        assert_eq!(
            names(compiled.params.names()),
            names(["endDate", "propertyName", "startDate", "websiteId"].into_iter())
        );
    }
}

#[test]
fn absent_property_name_adds_no_data_key_predicate() {
    let filters = QueryFilters::new(t0(), t1());

    for dialect in DIALECTS {
        let compiled = parse_filters(dialect, website_id(), &filters).unwrap();
        assert_eq!(compiled.filter_query, "");
        assert!(!compiled.params.contains("propertyName"));
        assert_eq!(
            names(compiled.params.names()),
            names(["endDate", "startDate", "websiteId"].into_iter())
        );
    }
}

#[test]
fn clauses_follow_the_fixed_kind_order() {
    let filters = QueryFilters::new(t0(), t1())
        .with_property_name("plan")
        .with_filter("country", Filter::any_of(["DE", "FR"]))
        .with_filter("url", Filter::equals("/pricing"))
        .with_filter(
            "browser",
            Filter::equals("safari").with_operator(FilterOperator::NotEquals),
        )
        .with_filter(
            "title",
            Filter::equals("Plans").with_operator(FilterOperator::Contains),
        );

    let relational = parse_relational_filters(website_id(), &filters).unwrap();
    assert_eq!(
        relational.filter_query,
        [
            "and event_data.data_key = {{propertyName}}",
            "and website_event.url_path = {{url}}",
            "and website_event.page_title ilike {{title}}",
            "and session.browser != {{browser}}",
            "and session.country = any({{country::varchar[]}})",
        ]
        .join("\n")
    );

    let columnar = parse_columnar_filters(website_id(), &filters).unwrap();
    assert_eq!(
        columnar.filter_query,
        [
            "and data_key = {propertyName:String}",
            "and url_path = {url:String}",
            "and positionCaseInsensitive(page_title, {title:String}) > 0",
            "and browser != {browser:String}",
            "and country in {country:Array(String)}",
        ]
        .join("\n")
    );
}

#[test]
fn every_placeholder_has_exactly_one_parameter() {
    let mut filters = QueryFilters::new(t0(), t1()).with_property_name("plan");
    for (index, kind) in enum_iterator::all::<FilterKind>().enumerate() {
        let filter = match index % 4 {
            0 => Filter::equals("a"),
            1 => Filter::equals("b").with_operator(FilterOperator::DoesNotContain),
            2 => Filter::any_of(["c", "d"]).with_operator(FilterOperator::NotEquals),
            _ => Filter::any_of(["e"]),
        };
        filters = filters.with_filter(kind.key(), filter);
    }

    for dialect in DIALECTS {
        let compiled = parse_filters(dialect, website_id(), &filters).unwrap();

        let in_fragment = names(
            dialect
                .placeholders(&compiled.filter_query)
                .into_iter()
                .map(|placeholder| placeholder.name),
        );
        let mut expected = names(enum_iterator::all::<FilterKind>().map(FilterKind::key));
        expected.insert("propertyName".to_string());
        assert_eq!(in_fragment, expected);

        let query = event_data_values::compose(compiled.clone()).unwrap();
        let in_query = names(
            dialect
                .placeholders(query.sql())
                .into_iter()
                .map(|placeholder| placeholder.name),
        );
        assert_eq!(in_query, names(compiled.params.names()));
    }
}

#[test]
fn empty_filters_contribute_nothing() {
    let filters = QueryFilters::new(t0(), t1())
        .with_property_name("plan")
        .with_filter("url", Filter::equals(""))
        .with_filter("country", Filter::any_of(Vec::<String>::new()));

    let compiled = parse_relational_filters(website_id(), &filters).unwrap();

    assert_eq!(
        compiled.filter_query,
        "and event_data.data_key = {{propertyName}}"
    );
    assert!(!compiled.params.contains("url"));
    assert!(!compiled.params.contains("country"));
}

#[test]
fn filter_values_stay_out_of_the_text() {
    let hostile = "x' or 1=1 --";
    let filters = QueryFilters::new(t0(), t1())
        .with_property_name(hostile)
        .with_filter("referrer", Filter::equals(hostile));

    for dialect in DIALECTS {
        let query = event_data_values::translate(dialect, website_id(), &filters).unwrap();
        assert!(!query.sql().contains(hostile));
    }
}

#[test]
fn start_after_end_is_rejected() {
    let filters = QueryFilters::new(t1(), t0()).with_property_name("plan");

    for dialect in DIALECTS {
        let error = event_data_values::translate(dialect, website_id(), &filters).unwrap_err();
        assert!(matches!(
            error,
            Error::FilterValidation(FilterValidationError::StartAfterEnd { .. })
        ));
    }
}

#[test]
fn equal_start_and_end_is_a_valid_window() {
    let filters = QueryFilters::new(t0(), t0()).with_property_name("plan");

    assert!(parse_relational_filters(website_id(), &filters).is_ok());
}

#[test]
fn unknown_filter_kind_is_rejected() {
    let filters = QueryFilters::new(t0(), t1())
        .with_property_name("plan")
        .with_filter("hostname", Filter::equals("example.com"));

    assert_eq!(
        parse_columnar_filters(website_id(), &filters),
        Err(Error::FilterValidation(
            FilterValidationError::UnknownFilterKind("hostname".to_string())
        ))
    );
}

#[test]
fn contains_needs_a_single_value() {
    let filters = QueryFilters::new(t0(), t1())
        .with_property_name("plan")
        .with_filter(
            "city",
            Filter::any_of(["Berlin", "Paris"]).with_operator(FilterOperator::Contains),
        );

    assert_eq!(
        parse_relational_filters(website_id(), &filters),
        Err(Error::FilterValidation(
            FilterValidationError::UnsupportedOperator {
                kind: FilterKind::City,
                operator: FilterOperator::Contains,
            }
        ))
    );
}

#[test]
fn the_values_query_needs_a_property_name() {
    let filters = QueryFilters::new(t0(), t1());

    for dialect in DIALECTS {
        assert_eq!(
            event_data_values::translate(dialect, website_id(), &filters),
            Err(Error::FilterValidation(
                FilterValidationError::MissingPropertyName
            ))
        );
    }
}

#[test]
fn the_values_query_is_capped() {
    let filters = QueryFilters::new(t0(), t1()).with_property_name("plan");

    for dialect in DIALECTS {
        let query = event_data_values::translate(dialect, website_id(), &filters).unwrap();
        assert!(query.sql().ends_with(&format!("limit {ROW_LIMIT}")));
        assert_eq!(query.params().len(), 4);
    }
}

#[test]
fn relational_values_query() {
    let filters = QueryFilters::new(t0(), t1())
        .with_property_name("plan")
        .with_filter("event", Filter::equals("signup"));

    let query =
        event_data_values::translate(Dialect::Postgresql, website_id(), &filters).unwrap();

    assert_eq!(
        query.sql(),
        r#"select
  event_data.string_value as "value",
  count(*) as "total"
from event_data
join website_event on website_event.event_id = event_data.website_event_id
where event_data.website_id = {{websiteId::uuid}}
  and event_data.created_at between {{startDate}} and {{endDate}}
and event_data.data_key = {{propertyName}}
and website_event.event_name = {{event}}
group by event_data.string_value
order by 2 desc
limit 500"#
    );
}

#[test]
fn relational_query_joins_only_what_filters_need() {
    let plain = QueryFilters::new(t0(), t1()).with_property_name("plan");
    let query = event_data_values::translate(Dialect::Postgresql, website_id(), &plain).unwrap();
    assert!(!query.sql().contains("join"));

    let by_country = plain.clone().with_filter("country", Filter::equals("DE"));
    let query =
        event_data_values::translate(Dialect::Postgresql, website_id(), &by_country).unwrap();
    assert!(query.sql().contains(
        "join website_event on website_event.event_id = event_data.website_event_id\n\
         join session on session.session_id = website_event.session_id\n"
    ));
}

#[test]
fn columnar_query_groups_on_the_display_value() {
    let filters = QueryFilters::new(t0(), t1()).with_property_name("plan");

    let query =
        event_data_values::translate(Dialect::Clickhouse, website_id(), &filters).unwrap();

    assert_eq!(
        query.sql(),
        r#"select
  multiIf(data_type = 2 and position(string_value, '.') > 0, replaceRegexpOne(string_value, '\\.?0+$', ''),
          data_type = 4, toString(date_trunc('hour', date_value)),
          string_value) as "value",
  max(data_type) as "dataType",
  count(*) as "total"
from event_data
where website_id = {websiteId:UUID}
  and created_at between {startDate:DateTime64} and {endDate:DateTime64}
and data_key = {propertyName:String}
group by value
order by total desc
limit 500"#
    );
}
