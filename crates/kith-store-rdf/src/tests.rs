//! End-to-end fetches against a scripted query service.
//!
//! Result rows are laid out with the column indices of the query the store
//! assembles for the same request, so the tests exercise assembly, execution
//! and decoding together.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Arc, Mutex},
};

use kith_core::{
  contact::{ContactType, LocalId, Relationship},
  detail::{FieldValue, names},
  filter::Filter,
  hint::FetchHint,
  sort::SortOrder,
  store::{ContactQuery, ContactReader},
};
use oxrdf::NamedNodeRef;

use crate::{
  Error, ErrorKind, RdfStore,
  config::EngineConfig,
  packing::{DETAIL, FIELD, GRAPH, LIST},
  query::{
    COLUMN_CONTACT, COLUMN_CONTEXT, COLUMN_CONTEXT_LABEL, COLUMN_ID, DetailBinding,
    DetailLayout, QueryBuilder, QueryContext,
  },
  schema::{
    DetailDefinition, FieldDefinition, Property, Schema, SchemaProvider, SchemaSet, ValueType,
  },
  service::{IdResolver, QueryResult, QueryService},
  vocab::{nco, nie},
};

// ─── Scripted service ────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
struct Unavailable;

/// Answers each query with the next scripted result of its contact type, or
/// an empty result.
#[derive(Default)]
struct FakeService {
  responses: Mutex<HashMap<ContactType, VecDeque<QueryResult>>>,
  queries:   Mutex<Vec<String>>,
  known:     HashMap<String, u32>,
  failing:   bool,
}

impl FakeService {
  fn knowing(mut self, iri: NamedNodeRef<'_>, id: u32) -> Self {
    self.known.insert(iri.as_str().to_owned(), id);
    self
  }

  fn failing() -> Self { Self { failing: true, ..Self::default() } }

  fn respond(&self, contact_type: ContactType, rows: Vec<Vec<Option<String>>>) {
    self
      .responses
      .lock()
      .unwrap()
      .entry(contact_type)
      .or_default()
      .push_back(QueryResult::new(rows));
  }

  fn queries(&self) -> Vec<String> { self.queries.lock().unwrap().clone() }
}

impl QueryService for FakeService {
  type Error = Unavailable;

  async fn select<'a>(&'a self, query: &'a str) -> Result<QueryResult, Unavailable> {
    self.queries.lock().unwrap().push(query.to_owned());
    if self.failing {
      return Err(Unavailable);
    }

    let contact_type = if query.contains(&nco::CONTACT_GROUP.to_string()) {
      ContactType::Group
    } else {
      ContactType::Person
    };
    let next = self
      .responses
      .lock()
      .unwrap()
      .get_mut(&contact_type)
      .and_then(VecDeque::pop_front);
    Ok(next.unwrap_or_default())
  }
}

impl IdResolver for FakeService {
  type Error = Unavailable;

  async fn resolve_ids<'a>(
    &'a self,
    iris: &'a [String],
  ) -> Result<Vec<Option<u32>>, Unavailable> {
    Ok(iris.iter().map(|iri| self.known.get(iri).copied()).collect())
  }
}

async fn store_with(service: FakeService) -> RdfStore<FakeService> {
  RdfStore::open(service, EngineConfig::default())
    .await
    .expect("store opens")
}

async fn store() -> RdfStore<FakeService> { store_with(FakeService::default()).await }

/// Person details discriminated by property, on a multi-valued list and on
/// a unique detail.
fn fixture_schema() -> Schema {
  let website = DetailDefinition::multi("Website")
    .resource([Property::new(nco::URL)])
    .field(FieldDefinition::new("Url", ValueType::Url))
    .field(
      FieldDefinition::new("SubTypes", ValueType::StringList).sub_types_by_property([
        (nco::WEBSITE_URL, "HomePage"),
        (nco::BLOG_URL, "Blog"),
        (nie::URL, "Archive"),
      ]),
    );

  let homepage = DetailDefinition::unique("Homepage")
    .field(FieldDefinition::new("Url", ValueType::Url).chain([Property::new(nco::URL)]))
    .field(
      FieldDefinition::new("SubType", ValueType::String)
        .chain([Property::new(nco::URL)])
        .sub_types_by_property([(nco::WEBSITE_URL, "HomePage"), (nco::BLOG_URL, "Blog")])
        .default_value("Favourite"),
    )
    .field(
      FieldDefinition::string("Kind", nco::ROLE)
        .allowable_values(["Personal", "Work"])
        .default_value("Personal"),
    );

  Schema {
    contact_type: ContactType::Person,
    classes:      vec![nco::PERSON_CONTACT.into_owned()],
    details:      vec![website, homepage],
  }
}

async fn fixture_store() -> RdfStore<FakeService> {
  let schemas = SchemaSet::new([fixture_schema()]).expect("fixture schema is valid");
  RdfStore::with_schemas(FakeService::default(), EngineConfig::default(), Arc::new(schemas))
    .await
    .expect("store opens")
}

// ─── Row layout helpers ──────────────────────────────────────────────────────

/// The query context the store builds for `query`, used to place cells.
fn layout<'s>(
  store: &'s RdfStore<FakeService>,
  contact_type: ContactType,
  query: &ContactQuery,
) -> QueryContext<'s> {
  let schema = store.schemas().schema(contact_type).expect("schema");
  QueryBuilder::new(schema, store.config(), store.cache())
    .build(&query.filter, &query.sorting, &query.fetch_hint)
    .expect("query builds")
}

fn row(layout: &QueryContext<'_>, id: LocalId) -> Vec<Option<String>> {
  let mut cells = vec![None; layout.query.projections.len()];
  cells[COLUMN_CONTACT] = Some(format!("urn:contact:{id}"));
  cells[COLUMN_ID] = Some(id.to_string());
  cells
}

fn affiliated(mut cells: Vec<Option<String>>, iri: &str, label: &str) -> Vec<Option<String>> {
  cells[COLUMN_CONTEXT] = Some(iri.to_owned());
  cells[COLUMN_CONTEXT_LABEL] = Some(label.to_owned());
  cells
}

fn binding<'c>(layout: &'c QueryContext<'_>, detail: &str) -> &'c DetailBinding {
  layout
    .bindings
    .iter()
    .find(|b| layout.detail(b).name == detail)
    .expect("detail is bound")
}

fn field_column(layout: &QueryContext<'_>, detail: &str, field: &str) -> usize {
  let binding = binding(layout, detail);
  let DetailLayout::Unique { slots, .. } = &binding.layout else {
    panic!("{detail} is not unique");
  };
  slots
    .iter()
    .find(|s| !s.custom && layout.detail(binding).fields[s.field].name == field)
    .expect("field has a column")
    .column
}

fn sub_type_column(layout: &QueryContext<'_>, detail: &str, label: &str) -> usize {
  let columns = match &binding(layout, detail).layout {
    DetailLayout::Unique { sub_type_columns, .. }
    | DetailLayout::Multi { sub_type_columns, .. } => sub_type_columns,
  };
  columns
    .iter()
    .find(|c| c.label == label)
    .expect("sub-type has a column")
    .column
}

fn main_column(layout: &QueryContext<'_>, detail: &str) -> usize {
  match &binding(layout, detail).layout {
    DetailLayout::Multi { main, .. } => *main,
    DetailLayout::Unique { .. } => panic!("{detail} is not multi-valued"),
  }
}

fn named(layout: &QueryContext<'_>, id: LocalId, first: &str, last: &str) -> Vec<Option<String>> {
  let mut cells = row(layout, id);
  cells[field_column(layout, names::NAME, names::FIELD_FIRST_NAME)] = Some(first.to_owned());
  cells[field_column(layout, names::NAME, names::FIELD_LAST_NAME)] = Some(last.to_owned());
  cells
}

fn names_query() -> ContactQuery {
  ContactQuery::default().with_hint(FetchHint::details([names::NAME]))
}

fn details_query(details: &[&str]) -> ContactQuery {
  ContactQuery::default().with_hint(FetchHint::details(details.iter().copied()))
}

// ─── Fetching ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetches_person_names() {
  let s = store().await;
  let query = names_query();
  let layout = layout(&s, ContactType::Person, &query);
  s.service().respond(ContactType::Person, vec![named(&layout, 7, "Ann", "Lee")]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].id.contact_type, ContactType::Person);
  assert_eq!(contacts[0].local_id(), 7);

  let name = contacts[0].detail(names::NAME).unwrap();
  assert_eq!(name.text(names::FIELD_FIRST_NAME), "Ann");
  assert_eq!(name.text(names::FIELD_LAST_NAME), "Lee");

  // One query per contact type.
  assert_eq!(s.service().queries().len(), 2);
}

#[tokio::test]
async fn reported_query_text_is_what_runs() {
  let s = store().await;
  let query = names_query();
  s.fetch_contacts(&query).await.unwrap();

  let reported = s.fetch_request(&query).query(ContactType::Person).unwrap();
  assert_eq!(s.service().queries()[0], reported);
}

#[tokio::test]
async fn decodes_phone_numbers_with_sub_types_and_provenance() {
  let s = store_with(FakeService::default().knowing(nco::CELL_PHONE_NUMBER, 301)).await;
  let query = ContactQuery::default().with_hint(FetchHint::details([names::PHONE_NUMBER]));
  let layout = layout(&s, ContactType::Person, &query);

  let default_graph = &s.config().default_graph;
  let mobile = format!("tel:1{FIELD}12345{GRAPH}{default_graph}{FIELD}301");
  let linked = format!("tel:2{FIELD}67890{GRAPH}telepathy:acct{FIELD}");

  let mut cells = affiliated(row(&layout, 7), "urn:affiliation:1", "home");
  cells[main_column(&layout, names::PHONE_NUMBER)] = Some(format!("{mobile}{DETAIL}{linked}"));
  s.service().respond(ContactType::Person, vec![cells]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  let phones: Vec<_> = contacts[0].details_named(names::PHONE_NUMBER).collect();
  assert_eq!(phones.len(), 2);

  assert_eq!(phones[0].text(names::FIELD_PHONE_NUMBER), "12345");
  assert_eq!(phones[0].detail_uri.as_deref(), Some("tel:1"));
  assert_eq!(
    phones[0].value(names::FIELD_SUB_TYPES),
    Some(&FieldValue::StringList(vec!["Mobile".to_owned()]))
  );
  assert_eq!(phones[0].context.as_deref(), Some("Home"));
  assert!(!phones[0].read_only);

  assert_eq!(phones[1].text(names::FIELD_PHONE_NUMBER), "67890");
  assert_eq!(
    phones[1].value(names::FIELD_SUB_TYPES),
    Some(&FieldValue::StringList(vec!["Voice".to_owned()]))
  );
  assert!(phones[1].read_only);
  assert_eq!(phones[1].linked_uris, vec!["telepathy:acct".to_owned()]);
}

#[tokio::test]
async fn affiliation_details_need_an_affiliation() {
  let s = store().await;
  let query = ContactQuery::default().with_hint(FetchHint::details([names::PHONE_NUMBER]));
  let layout = layout(&s, ContactType::Person, &query);

  let mut cells = row(&layout, 7);
  cells[main_column(&layout, names::PHONE_NUMBER)] =
    Some(format!("tel:1{FIELD}12345{GRAPH}{}{FIELD}", s.config().default_graph));
  s.service().respond(ContactType::Person, vec![cells]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  assert_eq!(contacts.len(), 1);
  assert!(contacts[0].detail(names::PHONE_NUMBER).is_none());
}

#[tokio::test]
async fn rows_of_one_contact_fold_together() {
  let s = store().await;
  let query = ContactQuery::default()
    .with_hint(FetchHint::details([names::NAME, names::EMAIL_ADDRESS]));
  let layout = layout(&s, ContactType::Person, &query);
  let graph = s.config().default_graph.clone();
  let email = main_column(&layout, names::EMAIL_ADDRESS);

  let mut home = affiliated(named(&layout, 7, "Ann", "Lee"), "urn:affiliation:1", "home");
  home[email] = Some(format!("mailto:a{FIELD}ann@home.example{GRAPH}{graph}"));
  let mut work = affiliated(named(&layout, 7, "Ann", "Lee"), "urn:affiliation:2", "work");
  work[email] = Some(format!("mailto:b{FIELD}ann@work.example{GRAPH}{graph}"));
  s.service().respond(ContactType::Person, vec![home, work]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].details_named(names::NAME).count(), 1);

  let contexts: Vec<_> = contacts[0]
    .details_named(names::EMAIL_ADDRESS)
    .map(|d| d.context.clone().unwrap_or_default())
    .collect();
  assert_eq!(contexts, ["Home", "Work"]);
}

#[tokio::test]
async fn conflicting_unique_rows_keep_one_instance() {
  let s = store().await;
  let query = names_query();
  let layout = layout(&s, ContactType::Person, &query);
  s.service().respond(ContactType::Person, vec![
    named(&layout, 7, "Ann", "Lee"),
    named(&layout, 7, "Ann", "Ray"),
  ]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  let names: Vec<_> = contacts[0].details_named(names::NAME).collect();
  assert_eq!(names.len(), 1);
  assert_eq!(names[0].text(names::FIELD_LAST_NAME), "Lee");
}

#[tokio::test]
async fn decoding_the_same_rows_twice_is_identical() {
  let s = store().await;
  let query = names_query();
  let layout = layout(&s, ContactType::Person, &query);
  for _ in 0..2 {
    s.service().respond(ContactType::Person, vec![
      named(&layout, 7, "Ann", "Lee"),
      named(&layout, 8, "Bob", "Ray"),
    ]);
  }

  let first = s.fetch_contacts(&query).await.unwrap();
  let second = s.fetch_contacts(&query).await.unwrap();
  assert_eq!(first.len(), 2);
  assert_eq!(first, second);
}

#[tokio::test]
async fn property_sub_types_unify_with_the_main_column() {
  let s = store().await;
  let query = ContactQuery::default().with_hint(FetchHint::details(["Url"]));
  let layout = layout(&s, ContactType::Person, &query);
  let DetailLayout::Multi { main, sub_type_columns, .. } = &binding(&layout, "Url").layout else {
    panic!("Url is multi-valued");
  };
  let blog = sub_type_columns.iter().find(|c| c.label == "Blog").expect("blog column");

  let mut cells = affiliated(row(&layout, 7), "urn:affiliation:1", "work");
  cells[*main] = Some(format!("http://home.example{DETAIL}http://blog.example"));
  cells[blog.column] = Some("http://blog.example".to_owned());
  s.service().respond(ContactType::Person, vec![cells]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  let urls: Vec<_> = contacts[0].details_named("Url").collect();
  assert_eq!(urls.len(), 2);
  assert_eq!(urls[0].text("Url"), "http://home.example");
  assert_eq!(urls[0].text("SubType"), "Favourite");
  assert_eq!(urls[1].text("SubType"), "Blog");
}

#[tokio::test]
async fn scalar_sub_type_keeps_the_first_matching_column() {
  let s = store().await;
  let query = details_query(&["Url"]);
  let layout = layout(&s, ContactType::Person, &query);

  let url = "http://both.example".to_owned();
  let mut cells = affiliated(row(&layout, 7), "urn:affiliation:1", "work");
  cells[main_column(&layout, "Url")] = Some(url.clone());
  cells[sub_type_column(&layout, "Url", "HomePage")] = Some(url.clone());
  cells[sub_type_column(&layout, "Url", "Blog")] = Some(url);
  s.service().respond(ContactType::Person, vec![cells]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  let urls: Vec<_> = contacts[0].details_named("Url").collect();
  assert_eq!(urls.len(), 1);
  assert_eq!(urls[0].text("SubType"), "HomePage");
}

#[tokio::test]
async fn list_sub_types_collect_every_matching_column_in_order() {
  let s = fixture_store().await;
  let query = details_query(&["Website"]);
  let layout = layout(&s, ContactType::Person, &query);

  let mut cells = row(&layout, 7);
  cells[main_column(&layout, "Website")] =
    Some(format!("http://a.example{DETAIL}http://b.example"));
  cells[sub_type_column(&layout, "Website", "HomePage")] = Some("http://a.example".to_owned());
  cells[sub_type_column(&layout, "Website", "Blog")] = Some(String::new());
  cells[sub_type_column(&layout, "Website", "Archive")] = Some("http://a.example".to_owned());
  s.service().respond(ContactType::Person, vec![cells]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  let sites: Vec<_> = contacts[0].details_named("Website").collect();
  assert_eq!(sites.len(), 2);

  assert_eq!(sites[0].text("Url"), "http://a.example");
  assert_eq!(
    sites[0].value("SubTypes"),
    Some(&FieldValue::StringList(vec!["HomePage".to_owned(), "Archive".to_owned()]))
  );
  // No column matched and the field has no default.
  assert_eq!(sites[1].value("SubTypes"), Some(&FieldValue::StringList(vec![])));
}

#[tokio::test]
async fn unique_details_take_sub_types_from_non_empty_columns() {
  let s = fixture_store().await;
  let query = details_query(&["Homepage"]);
  let layout = layout(&s, ContactType::Person, &query);
  let url = field_column(&layout, "Homepage", "Url");
  let blog = sub_type_column(&layout, "Homepage", "Blog");

  let mut blogger = row(&layout, 7);
  blogger[url] = Some("http://blog.example".to_owned());
  blogger[blog] = Some("http://blog.example".to_owned());
  let mut plain = row(&layout, 8);
  plain[url] = Some("http://plain.example".to_owned());
  let mut bare = row(&layout, 9);
  bare[blog] = Some("http://stray.example".to_owned());
  s.service().respond(ContactType::Person, vec![blogger, plain, bare]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  assert_eq!(contacts.len(), 3);
  let homepage = contacts[0].detail("Homepage").unwrap();
  assert_eq!(homepage.text("Url"), "http://blog.example");
  assert_eq!(homepage.text("SubType"), "Blog");
  assert_eq!(contacts[1].detail("Homepage").unwrap().text("SubType"), "Favourite");
  // Sub-type columns alone do not make a detail.
  assert!(contacts[2].detail("Homepage").is_none());
}

#[tokio::test]
async fn values_outside_the_allowable_set_are_replaced() {
  let s = fixture_store().await;
  let query = details_query(&["Homepage"]);
  let layout = layout(&s, ContactType::Person, &query);
  let kind = field_column(&layout, "Homepage", "Kind");

  let mut work = row(&layout, 7);
  work[kind] = Some("Work".to_owned());
  let mut party = row(&layout, 8);
  party[kind] = Some("Party".to_owned());
  s.service().respond(ContactType::Person, vec![work, party]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  assert_eq!(contacts[0].detail("Homepage").unwrap().text("Kind"), "Work");
  assert_eq!(contacts[1].detail("Homepage").unwrap().text("Kind"), "Personal");
}

#[tokio::test]
async fn filtering_on_a_disallowed_value_matches_nothing() {
  let s = fixture_store().await;
  let filter = Filter::detail("Homepage", "Kind", "Party", Default::default());
  let query = ContactQuery::new(filter).with_hint(FetchHint::details(["Homepage"]));

  let text = s.fetch_request(&query).query(ContactType::Person).unwrap();
  assert!(text.contains("FILTER(false)"));
}

#[tokio::test]
async fn decodes_group_memberships() {
  let s = store().await;
  let query = ContactQuery::default().with_hint(FetchHint::details([names::NICKNAME]));
  let layout = layout(&s, ContactType::Group, &query);
  let columns = layout.relationship_columns.expect("relationships are fetched");

  let mut cells = row(&layout, 5);
  cells[columns.groups] = Some(format!("3{LIST}9"));
  cells[columns.members.expect("groups have members")] = Some("11".to_owned());
  s.service().respond(ContactType::Group, vec![cells]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].id.contact_type, ContactType::Group);
  assert_eq!(contacts[0].relationships, vec![
    Relationship::has_member(3, 5),
    Relationship::has_member(9, 5),
    Relationship::has_member(5, 11),
  ]);
}

#[tokio::test]
async fn decodes_custom_details() {
  let s = store().await;
  let query = ContactQuery::default().with_hint(FetchHint::details(["Pet"]));
  let layout = layout(&s, ContactType::Person, &query);

  let mut cells = row(&layout, 7);
  cells[layout.custom_detail_column.expect("custom column")] =
    Some(format!("Pet{FIELD}Name{FIELD}1:Rex{LIST}0:Fido"));
  s.service().respond(ContactType::Person, vec![cells]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  let pet = contacts[0].detail("Pet").unwrap();
  assert_eq!(
    pet.value("Name"),
    Some(&FieldValue::StringList(vec!["Fido".to_owned(), "Rex".to_owned()]))
  );
}

// ─── Limits and ordering ─────────────────────────────────────────────────────

#[tokio::test]
async fn unsorted_limit_stops_after_max_contacts() {
  let s = store().await;
  let query = ContactQuery::default()
    .with_hint(FetchHint::details([names::NAME]).with_max_count(2));
  let layout = layout(&s, ContactType::Person, &query);
  s.service().respond(ContactType::Person, vec![
    named(&layout, 1, "Ann", "Lee"),
    named(&layout, 2, "Bob", "Ray"),
    named(&layout, 3, "Cy", "Fox"),
  ]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  let ids: Vec<_> = contacts.iter().map(|c| c.local_id()).collect();
  assert_eq!(ids, [1, 2]);

  // The limit is exhausted before the group query.
  assert_eq!(s.service().queries().len(), 1);
}

#[tokio::test]
async fn sorted_limit_prefetches_ids() {
  let s = store().await;
  let by_last_name =
    SortOrder::new(names::NAME, names::FIELD_LAST_NAME).case_insensitive().blanks_first();
  let query = ContactQuery::default()
    .sorted_by(by_last_name)
    .with_hint(FetchHint::details([names::NAME]).with_max_count(1));

  let id_row = |id: LocalId, key: &str| {
    vec![Some(format!("urn:contact:{id}")), Some(id.to_string()), Some(key.to_owned())]
  };
  s.service().respond(ContactType::Person, vec![id_row(9, "adams"), id_row(4, "brown")]);

  let layout = layout(&s, ContactType::Person, &names_query());
  s.service().respond(ContactType::Person, vec![named(&layout, 9, "Zoe", "Adams")]);

  let contacts = s.fetch_contacts(&query).await.unwrap();
  let ids: Vec<_> = contacts.iter().map(|c| c.local_id()).collect();
  assert_eq!(ids, [9]);

  let queries = s.service().queries();
  assert_eq!(queries.len(), 4);
  assert!(queries[0].contains(" LIMIT 1"));
  assert!(queries[2].contains(" IN (9)"));
}

#[tokio::test]
async fn unsortable_id_fetch_sorts_in_memory() {
  let s = store().await;
  let by_label =
    SortOrder::new(names::DISPLAY_LABEL, names::FIELD_LABEL).case_insensitive().blanks_first();
  let query = ContactQuery::default().sorted_by(by_label);

  let narrowed = ContactQuery {
    fetch_hint: FetchHint::details([names::DISPLAY_LABEL]).without_relationships(),
    ..query.clone()
  };
  let layout = layout(&s, ContactType::Person, &narrowed);
  s.service().respond(ContactType::Person, vec![
    named(&layout, 1, "Zed", ""),
    named(&layout, 2, "Amy", ""),
  ]);

  let ids = s.fetch_contact_ids(&query).await.unwrap();
  let ids: Vec<_> = ids.iter().map(|id| id.local_id).collect();
  assert_eq!(ids, [2, 1]);
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_id_filter_is_a_bad_argument() {
  let s = store().await;
  let query = ContactQuery::new(Filter::ids([]));
  let err = s.fetch_contacts(&query).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::BadArgument);
  assert!(s.service().queries().is_empty());
}

#[tokio::test]
async fn canceled_fetch_returns_nothing() {
  let s = store().await;
  let query = names_query();
  query.cancel.cancel();

  let err = s.fetch_contacts(&query).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Canceled);
}

#[tokio::test]
async fn missing_contact_does_not_exist() {
  let s = store().await;
  let err = s.contact(77, FetchHint::default()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::DoesNotExist);
}

#[tokio::test]
async fn execution_failures_surface() {
  let s = store_with(FakeService::failing()).await;
  let err = s.fetch_contacts(&names_query()).await.unwrap_err();
  assert!(matches!(err, Error::Execution(_)));
  assert_eq!(err.kind(), ErrorKind::Unspecified);
}

// ─── Setup ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn opening_resolves_schema_resources() {
  let s = store_with(FakeService::default().knowing(nco::CELL_PHONE_NUMBER, 301)).await;
  assert_eq!(s.cache().id(nco::CELL_PHONE_NUMBER.as_str()), Some(301));
  assert_eq!(s.cache().iri(301), Some(nco::CELL_PHONE_NUMBER.as_str()));
}

#[tokio::test]
async fn invalid_configuration_is_rejected() {
  let config = EngineConfig { local_phone_number_length: 0, ..EngineConfig::default() };
  let result = RdfStore::open(FakeService::default(), config).await;
  assert!(matches!(result, Err(Error::Config(_))));
}
