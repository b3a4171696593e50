use std::{collections::HashMap, sync::Arc};

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
		DeletePointsBuilder, Distance, FieldType, Filter, GetPointsBuilder, PointId, PointStruct,
		PointsIdsList, Query, QueryPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
		point_id::PointIdOptions, value::Kind, vectors_config,
	},
};
use uuid::Uuid;

use crate::{Error, Result};
use rag_domain::{Chunk, Namespace};
use rag_providers::Embedder;

pub const NAMESPACE_FIELD: &str = "namespace";

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
	embedder: Arc<Embedder>,
}
impl QdrantStore {
	/// Connects and makes sure the collection exists with the configured vector size.
	pub async fn connect(cfg: &rag_config::Qdrant, embedder: Arc<Embedder>) -> Result<Self> {
		crate::check_embedder(&embedder, cfg.vector_dim)?;

		let mut builder = Qdrant::from_url(&cfg.url);

		if let Some(api_key) = cfg.api_key.as_ref() {
			builder = builder.api_key(api_key.clone());
		}

		let store = Self {
			client: builder.build()?,
			collection: cfg.collection.clone(),
			vector_dim: cfg.vector_dim,
			embedder,
		};

		store.ensure_collection().await?;

		Ok(store)
	}

	pub(crate) fn embedder(&self) -> &Embedder {
		&self.embedder
	}

	async fn ensure_collection(&self) -> Result<()> {
		if !self.client.collection_exists(&self.collection).await? {
			self.client
				.create_collection(
					CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
						VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
					),
				)
				.await?;
			self.client
				.create_field_index(
					CreateFieldIndexCollectionBuilder::new(
						self.collection.clone(),
						NAMESPACE_FIELD,
						FieldType::Keyword,
					)
					.wait(true),
				)
				.await?;

			tracing::info!(
				collection = %self.collection,
				vector_dim = self.vector_dim,
				"Created Qdrant collection."
			);

			return Ok(());
		}

		let info = self.client.collection_info(&self.collection).await?;
		let size = info
			.result
			.and_then(|info| info.config)
			.and_then(|config| config.params)
			.and_then(|params| params.vectors_config)
			.and_then(|vectors| vectors.config)
			.and_then(|config| match config {
				vectors_config::Config::Params(params) => Some(params.size),
				vectors_config::Config::ParamsMap(_) => None,
			});

		match size {
			Some(size) if size == u64::from(self.vector_dim) => Ok(()),
			Some(size) => Err(Error::StoreConfig {
				message: format!(
					"Collection {} has vector size {size}, expected {}.",
					self.collection, self.vector_dim
				),
			}),
			None => Err(Error::StoreConfig {
				message: format!(
					"Collection {} does not use a single unnamed vector.",
					self.collection
				),
			}),
		}
	}

	pub(crate) async fn existing_ids(
		&self,
		ids: &[String],
		namespace: &Namespace,
	) -> Result<Vec<String>> {
		let by_point: HashMap<String, &String> =
			ids.iter().map(|id| (point_uuid(namespace, id).to_string(), id)).collect();
		let point_ids: Vec<PointId> = by_point.keys().cloned().map(PointId::from).collect();
		let response = self
			.client
			.get_points(
				GetPointsBuilder::new(self.collection.clone(), point_ids)
					.with_payload(false)
					.with_vectors(false),
			)
			.await?;

		Ok(response
			.result
			.into_iter()
			.filter_map(|point| point.id.and_then(point_id_to_uuid))
			.filter_map(|uuid| by_point.get(&uuid).map(|id| (*id).clone()))
			.collect())
	}

	pub(crate) async fn write(
		&self,
		chunks: Vec<Chunk>,
		vectors: Vec<Vec<f32>>,
		namespace: &Namespace,
	) -> Result<()> {
		if chunks.len() != vectors.len() {
			return Err(Error::InvalidArgument(format!(
				"Got {} vectors for {} chunks.",
				vectors.len(),
				chunks.len()
			)));
		}

		let mut points = Vec::with_capacity(chunks.len());

		for (chunk, vector) in chunks.into_iter().zip(vectors) {
			crate::check_dimension(&vector, self.vector_dim as usize)?;

			let id = point_uuid(namespace, &chunk.id).to_string();
			let mut payload = HashMap::<String, Value>::new();

			payload.insert(NAMESPACE_FIELD.to_string(), Value::from(namespace.to_string()));
			payload.insert("chunk_id".to_string(), Value::from(chunk.id));
			payload.insert("text".to_string(), Value::from(chunk.text));
			payload.insert("index".to_string(), Value::from(i64::from(chunk.index)));
			payload.insert("source".to_string(), Value::from(chunk.source));
			points.push(PointStruct::new(id, vector, Payload::from(payload)));
		}

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
			.await?;

		Ok(())
	}

	pub(crate) async fn search(
		&self,
		vector: &[f32],
		namespace: &Namespace,
		k: usize,
	) -> Result<Vec<Chunk>> {
		let response = self
			.client
			.query(
				QueryPointsBuilder::new(self.collection.clone())
					.query(Query::new_nearest(vector.to_vec()))
					.filter(namespace_filter(namespace))
					.limit(k as u64)
					.with_payload(true),
			)
			.await?;

		response.result.into_iter().map(|point| chunk_from_payload(&point.payload)).collect()
	}

	pub(crate) async fn remove(&self, ids: &[String], namespace: &Namespace) -> Result<()> {
		let ids =
			ids.iter().map(|id| PointId::from(point_uuid(namespace, id).to_string())).collect();

		self.client
			.delete_points(
				DeletePointsBuilder::new(self.collection.clone())
					.points(PointsIdsList { ids })
					.wait(true),
			)
			.await?;

		Ok(())
	}
}

/// Stable point id for a chunk in a namespace. Distinct namespaces never share a point.
pub fn point_uuid(namespace: &Namespace, chunk_id: &str) -> Uuid {
	let key = format!("{namespace}\u{0}{chunk_id}");

	Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

fn namespace_filter(namespace: &Namespace) -> Filter {
	Filter::must([Condition::matches(NAMESPACE_FIELD, namespace.to_string())])
}

fn point_id_to_uuid(point_id: PointId) -> Option<String> {
	match point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id),
		_ => None,
	}
}

fn chunk_from_payload(payload: &HashMap<String, Value>) -> Result<Chunk> {
	Ok(Chunk {
		id: payload_string(payload, "chunk_id")?,
		text: payload_string(payload, "text")?,
		index: payload_index(payload)?,
		source: payload_string(payload, "source")?,
	})
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Result<String> {
	match payload.get(key).and_then(|value| value.kind.as_ref()) {
		Some(Kind::StringValue(text)) => Ok(text.clone()),
		_ => Err(Error::CorruptPayload(format!("Missing string field {key}."))),
	}
}

fn payload_index(payload: &HashMap<String, Value>) -> Result<u32> {
	match payload.get("index").and_then(|value| value.kind.as_ref()) {
		Some(Kind::IntegerValue(index)) => u32::try_from(*index)
			.map_err(|_| Error::CorruptPayload(format!("Index {index} is out of range."))),
		_ => Err(Error::CorruptPayload("Missing integer field index.".to_string())),
	}
}
