//! [`RdfStore`], the triple-store implementation of [`ContactReader`].

use std::sync::Arc;

use kith_core::{
  contact::{Contact, ContactId, LocalId},
  filter::Filter,
  hint::FetchHint,
  store::{ContactQuery, ContactReader},
};
use oxrdf::NamedNode;

use crate::{
  Error, ErrorKind, Result,
  cache::ResourceCache,
  config::EngineConfig,
  fetch::{ContactFetchRequest, ContactIdFetchRequest},
  schema::{SchemaProvider, SchemaSet},
  service::{IdResolver, QueryService},
  synth::Pipeline,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Contact reads over a triple store reachable through `S`.
///
/// The schema set and the resource cache are immutable while requests run;
/// [`RdfStore::refresh_cache`] needs exclusive access.
pub struct RdfStore<S> {
  service:  S,
  schemas:  Arc<dyn SchemaProvider>,
  config:   EngineConfig,
  cache:    ResourceCache,
  pipeline: Pipeline,
}

impl<S> RdfStore<S>
where
  S: QueryService + IdResolver,
{
  /// Open a store with the built-in person and group schemas.
  pub async fn open(service: S, config: EngineConfig) -> Result<Self> {
    Self::with_schemas(service, config, Arc::new(SchemaSet::builtin())).await
  }

  pub async fn with_schemas(
    service: S,
    config: EngineConfig,
    schemas: Arc<dyn SchemaProvider>,
  ) -> Result<Self> {
    config.validate()?;
    let pipeline = Pipeline::standard(&config);
    check_pipeline(schemas.as_ref(), &pipeline);

    let cache = ResourceCache::new();
    let mut store = Self { service, schemas, config, cache, pipeline };
    store.refresh_cache().await?;

    tracing::info!(resources = store.cache.len(), "rdf store ready");
    Ok(store)
  }

  /// Drop every cached id and resolve the schema resources again.
  pub async fn refresh_cache(&mut self) -> Result<()> {
    let iris: Vec<NamedNode> = self
      .schemas
      .schemas()
      .into_iter()
      .flat_map(|schema| schema.resource_iris())
      .collect();

    self.cache.clear();
    self.cache.resolve(&self.service, &iris).await
  }

  pub fn fetch_request<'a>(
    &'a self,
    query: &'a ContactQuery,
  ) -> ContactFetchRequest<'a, S> {
    ContactFetchRequest::new(self, query)
  }
}

impl<S> RdfStore<S> {
  pub fn service(&self) -> &S { &self.service }

  pub fn schemas(&self) -> &dyn SchemaProvider { self.schemas.as_ref() }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn cache(&self) -> &ResourceCache { &self.cache }

  pub(crate) fn pipeline(&self) -> &Pipeline { &self.pipeline }
}

/// Warn about computed details no post-processing step produces, and about
/// step inputs the schema would not fetch.
fn check_pipeline(schemas: &dyn SchemaProvider, pipeline: &Pipeline) {
  for schema in schemas.schemas() {
    for detail in schema.details.iter().filter(|d| d.synthesized) {
      let name = &detail.name;
      let Some(dependencies) = pipeline.dependencies_of(name) else {
        tracing::warn!(detail = %name, "no post-processing step computes this detail");
        continue;
      };
      for dependency in dependencies {
        let known = schema.detail(dependency).is_some();
        if known && !detail.dependencies.iter().any(|d| d == *dependency) {
          tracing::warn!(
            detail = %name,
            %dependency,
            "computed detail input is not fetched"
          );
        }
      }
    }
  }
}

// ─── ContactReader impl ──────────────────────────────────────────────────────

impl<S> ContactReader for RdfStore<S>
where
  S: QueryService + IdResolver,
{
  type Error = Error;

  async fn fetch_contacts<'a>(
    &'a self,
    query: &'a ContactQuery,
  ) -> Result<Vec<Contact>> {
    ContactFetchRequest::new(self, query).run().await
  }

  async fn fetch_contact_ids<'a>(
    &'a self,
    query: &'a ContactQuery,
  ) -> Result<Vec<ContactId>> {
    match ContactIdFetchRequest::new(self, query).run().await {
      Err(error)
        if error.kind() == ErrorKind::NotSupported && !query.sorting.is_empty() =>
      {
        tracing::debug!(%error, "sorting ids in memory");
        let narrowed = ContactQuery {
          fetch_hint: FetchHint {
            detail_names: query.sorting.iter().map(|o| o.detail.clone()).collect(),
            no_relationships: true,
            max_count: query.fetch_hint.max_count,
            ..FetchHint::default()
          },
          ..query.clone()
        };
        let contacts = ContactFetchRequest::new(self, &narrowed).run().await?;
        Ok(contacts.into_iter().map(|c| c.id).collect())
      }
      other => other,
    }
  }

  async fn contact(&self, id: LocalId, fetch_hint: FetchHint) -> Result<Contact> {
    let query = ContactQuery::new(Filter::ids([id])).with_hint(fetch_hint);
    ContactFetchRequest::new(self, &query)
      .run()
      .await?
      .into_iter()
      .next()
      .ok_or(Error::Core(kith_core::Error::DoesNotExist(id)))
  }
}
