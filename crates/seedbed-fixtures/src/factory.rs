//! Factories fabricating random and partially specified entities.
//!
//! A [`Factory`] knows how to create one random entity. Everything else
//! (batches, overrides, persisting through a unit of work) is provided by
//! [`FactoryRef`], the shared handle the registry hands out.
//!
//! # Example
//!
//! ```ignore
//! use fake::{Fake, faker::name::en::Name};
//! use seedbed_fixtures::prelude::*;
//!
//! struct UserFactory;
//!
//! impl Factory for UserFactory {
//!     type Entity = User;
//!
//!     fn instantiate(_lookup: Lookup) -> Self {
//!         UserFactory
//!     }
//!
//!     fn create_random(&self) -> SeedingResult<User> {
//!         Ok(User { id: None, name: Name().fake() })
//!     }
//! }
//!
//! let users = root.factory_of::<User>().unwrap();
//! let admins = users.partial_many(3, |user| user.admin = true)?;
//! ```

use std::fmt;
use std::sync::Arc;

use seedbed_db::UnitOfWork;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::bridge::Lookup;
use crate::error::SeedingResult;
use crate::key::{DEFAULT_FACTORY_NAME, factory_key};

/// Creates random instances of an entity type.
pub trait Factory: Send + Sync + Sized + 'static {
	/// The type this factory fabricates.
	type Entity: Send + 'static;

	/// Distinguishes several factories of the same entity type.
	const NAME: &'static str = DEFAULT_FACTORY_NAME;

	/// Builds the factory. While the root loads, `lookup` finds the factories
	/// declared before this one.
	fn instantiate(lookup: Lookup) -> Self;

	/// Creates one entity with random field values.
	fn create_random(&self) -> SeedingResult<Self::Entity>;
}

/// Object-safe view of a [`Factory`].
pub trait EntityFactory<E>: Send + Sync {
	fn create_random(&self) -> SeedingResult<E>;
}

impl<F: Factory> EntityFactory<F::Entity> for F {
	fn create_random(&self) -> SeedingResult<F::Entity> {
		Factory::create_random(self)
	}
}

/// An entity that can be persisted through a [`UnitOfWork`].
///
/// Entities are saved as JSON objects into [`Entity::TABLE`]. A stored
/// record is read back into the entity, so generated ids are picked up.
pub trait Entity: Serialize + DeserializeOwned + Send + 'static {
	const TABLE: &'static str;
}

/// Shared handle on a factory instance.
pub struct FactoryRef<E> {
	key: Arc<str>,
	factory: Arc<dyn EntityFactory<E>>,
}

impl<E> Clone for FactoryRef<E> {
	fn clone(&self) -> Self {
		Self {
			key: Arc::clone(&self.key),
			factory: Arc::clone(&self.factory),
		}
	}
}

impl<E> fmt::Debug for FactoryRef<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FactoryRef").field("key", &self.key).finish_non_exhaustive()
	}
}

impl<E: Send + 'static> FactoryRef<E> {
	pub fn new<F: Factory<Entity = E>>(factory: F) -> Self {
		Self {
			key: Arc::from(factory_key::<E>(F::NAME)),
			factory: Arc::new(factory),
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn random(&self) -> SeedingResult<E> {
		self.factory.create_random()
	}

	pub fn random_many(&self, count: usize) -> SeedingResult<Vec<E>> {
		(0..count).map(|_| self.random()).collect()
	}

	/// Creates a random entity and applies `overwrite` to it.
	pub fn partial(&self, overwrite: impl FnOnce(&mut E)) -> SeedingResult<E> {
		let mut entity = self.random()?;
		overwrite(&mut entity);
		Ok(entity)
	}

	pub fn partial_many(&self, count: usize, mut overwrite: impl FnMut(&mut E)) -> SeedingResult<Vec<E>> {
		(0..count).map(|_| self.partial(&mut overwrite)).collect()
	}

	/// Creates one entity per item of `items`, applying `apply` with the
	/// item to each.
	pub fn partial_map<T, I, F>(&self, items: I, apply: F) -> SeedingResult<Vec<E>>
	where
		I: IntoIterator<Item = T>,
		F: FnMut(&mut E, T),
	{
		self.partial_map_with(|_| {}, items, apply)
	}

	/// Like [`FactoryRef::partial_map`], applying `common` to every entity
	/// before the per-item override.
	pub fn partial_map_with<T, I, C, F>(&self, mut common: C, items: I, mut apply: F) -> SeedingResult<Vec<E>>
	where
		I: IntoIterator<Item = T>,
		C: FnMut(&mut E),
		F: FnMut(&mut E, T),
	{
		items
			.into_iter()
			.map(|item| {
				let mut entity = self.random()?;
				common(&mut entity);
				apply(&mut entity, item);
				Ok(entity)
			})
			.collect()
	}

	/// Returns the same operations, persisting every created entity through
	/// `work`.
	pub fn saving<'w>(&self, work: &'w mut dyn UnitOfWork) -> Saving<'w, E> {
		Saving {
			factory: self.clone(),
			work,
		}
	}
}

/// A factory bound to a unit of work. See [`FactoryRef::saving`].
pub struct Saving<'w, E> {
	factory: FactoryRef<E>,
	work: &'w mut dyn UnitOfWork,
}

impl<E: Entity> Saving<'_, E> {
	pub async fn random(&mut self) -> SeedingResult<E> {
		let entity = self.factory.random()?;
		self.save(entity).await
	}

	pub async fn random_many(&mut self, count: usize) -> SeedingResult<Vec<E>> {
		let entities = self.factory.random_many(count)?;
		self.save_all(entities).await
	}

	pub async fn partial(&mut self, overwrite: impl FnOnce(&mut E)) -> SeedingResult<E> {
		let entity = self.factory.partial(overwrite)?;
		self.save(entity).await
	}

	pub async fn partial_many(&mut self, count: usize, overwrite: impl FnMut(&mut E)) -> SeedingResult<Vec<E>> {
		let entities = self.factory.partial_many(count, overwrite)?;
		self.save_all(entities).await
	}

	pub async fn partial_map<T, I, F>(&mut self, items: I, apply: F) -> SeedingResult<Vec<E>>
	where
		I: IntoIterator<Item = T>,
		F: FnMut(&mut E, T),
	{
		let entities = self.factory.partial_map(items, apply)?;
		self.save_all(entities).await
	}

	pub async fn partial_map_with<T, I, C, F>(&mut self, common: C, items: I, apply: F) -> SeedingResult<Vec<E>>
	where
		I: IntoIterator<Item = T>,
		C: FnMut(&mut E),
		F: FnMut(&mut E, T),
	{
		let entities = self.factory.partial_map_with(common, items, apply)?;
		self.save_all(entities).await
	}

	/// Persists an entity created elsewhere.
	pub async fn save(&mut self, entity: E) -> SeedingResult<E> {
		let record = serde_json::to_value(&entity)?;
		let stored = self.work.save(E::TABLE, record).await?;
		Ok(serde_json::from_value(stored)?)
	}

	async fn save_all(&mut self, entities: Vec<E>) -> SeedingResult<Vec<E>> {
		let mut saved = Vec::with_capacity(entities.len());
		for entity in entities {
			saved.push(self.save(entity).await?);
		}
		Ok(saved)
	}
}
