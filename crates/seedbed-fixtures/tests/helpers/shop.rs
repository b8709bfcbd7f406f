//! A small shop domain: users, posts and tags.

use std::sync::atomic::{AtomicUsize, Ordering};

use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::Name;
use seedbed_fixtures::prelude::*;
use seedbed_fixtures::Declaration;
use serde::{Deserialize, Serialize};

pub static USERS_INSTALLS: AtomicUsize = AtomicUsize::new(0);
pub static PUBLISH_INSTALLS: AtomicUsize = AtomicUsize::new(0);

pub fn reset_counters() {
	USERS_INSTALLS.store(0, Ordering::SeqCst);
	PUBLISH_INSTALLS.store(0, Ordering::SeqCst);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
	pub name: String,
	pub email: String,
	pub admin: bool,
}

impl Entity for User {
	const TABLE: &'static str = "users";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
	pub author_id: i64,
	pub title: String,
}

impl Entity for Post {
	const TABLE: &'static str = "posts";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
	pub label: String,
}

impl Entity for Tag {
	const TABLE: &'static str = "tags";
}

pub struct UserFactory;

impl Factory for UserFactory {
	type Entity = User;

	fn instantiate(_lookup: Lookup) -> Self {
		UserFactory
	}

	fn create_random(&self) -> SeedingResult<User> {
		Ok(User {
			id: None,
			name: Name().fake(),
			email: SafeEmail().fake(),
			admin: false,
		})
	}
}

/// Builds admins on top of the default user factory.
pub struct AdminFactory {
	lookup: Lookup,
}

impl Factory for AdminFactory {
	type Entity = User;
	const NAME: &'static str = "admin";

	fn instantiate(lookup: Lookup) -> Self {
		Self { lookup }
	}

	fn create_random(&self) -> SeedingResult<User> {
		self.lookup
			.require_factory::<User>()?
			.partial(|user| user.admin = true)
	}
}

pub struct PostFactory;

impl Factory for PostFactory {
	type Entity = Post;

	fn instantiate(_lookup: Lookup) -> Self {
		PostFactory
	}

	fn create_random(&self) -> SeedingResult<Post> {
		Ok(Post {
			id: None,
			author_id: 0,
			title: Sentence(2..5).fake(),
		})
	}
}

pub struct TagFactory;

impl Factory for TagFactory {
	type Entity = Tag;

	fn instantiate(_lookup: Lookup) -> Self {
		TagFactory
	}

	fn create_random(&self) -> SeedingResult<Tag> {
		Ok(Tag {
			id: None,
			label: Word().fake(),
		})
	}
}

pub struct UsersFixture {
	lookup: Lookup,
}

#[async_trait]
impl StaticFixture for UsersFixture {
	type Output = Vec<User>;
	const NAME: Option<&'static str> = Some("users");

	fn instantiate(lookup: Lookup) -> Self {
		Self { lookup }
	}

	async fn install(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Vec<User>> {
		USERS_INSTALLS.fetch_add(1, Ordering::SeqCst);
		let mut users = self.lookup.require_factory::<User>()?.saving(work).random_many(2).await?;
		let admin = self
			.lookup
			.require_factory_named::<User>("admin")?
			.saving(work)
			.random()
			.await?;
		users.push(admin);
		Ok(users)
	}
}

pub struct PostsFixture {
	lookup: Lookup,
}

#[async_trait]
impl StaticFixture for PostsFixture {
	type Output = Vec<Post>;
	const NAME: Option<&'static str> = Some("posts");

	fn dependencies() -> Vec<FixtureRef> {
		vec![FixtureRef::of_static::<UsersFixture>()]
	}

	fn isolation() -> Isolation {
		Isolation::Level(IsolationLevel::RepeatableRead)
	}

	fn instantiate(lookup: Lookup) -> Self {
		Self { lookup }
	}

	async fn install(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Vec<Post>> {
		let users = self.lookup.require_result::<UsersFixture>()?;
		let author_ids: Vec<i64> = users.iter().filter_map(|user| user.id).collect();
		self.lookup
			.require_factory::<Post>()?
			.saving(work)
			.partial_map(author_ids, |post, author_id| post.author_id = author_id)
			.await
	}
}

pub struct TagsFixture {
	lookup: Lookup,
}

#[async_trait]
impl StaticFixture for TagsFixture {
	type Output = Vec<Tag>;
	const NAME: Option<&'static str> = Some("tags");

	fn instantiate(lookup: Lookup) -> Self {
		Self { lookup }
	}

	async fn install(&self, work: &mut dyn UnitOfWork) -> SeedingResult<Vec<Tag>> {
		self.lookup
			.require_factory::<Tag>()?
			.saving(work)
			.partial_map(["rust", "sql"], |tag, label| tag.label = label.to_string())
			.await
	}
}

/// Publishes a post by the first seeded user.
pub struct PublishPost {
	lookup: Lookup,
}

#[async_trait]
impl DynamicFixture for PublishPost {
	type Params = String;
	type Output = Post;
	const NAME: Option<&'static str> = Some("publish_post");

	fn dependencies() -> Vec<FixtureRef> {
		vec![FixtureRef::of_static::<UsersFixture>()]
	}

	fn isolation() -> Isolation {
		Isolation::Default
	}

	fn instantiate(lookup: Lookup) -> Self {
		Self { lookup }
	}

	async fn install(&self, work: &mut dyn UnitOfWork, title: String) -> SeedingResult<Post> {
		PUBLISH_INSTALLS.fetch_add(1, Ordering::SeqCst);
		let author_id = self
			.lookup
			.fixture_result_of::<UsersFixture>()?
			.and_then(|users| users.first().and_then(|user| user.id))
			.unwrap_or_default();
		self.lookup
			.require_factory::<Post>()?
			.saving(work)
			.partial(|post| {
				post.author_id = author_id;
				post.title = title;
			})
			.await
	}
}

pub fn declarations() -> Vec<Declaration> {
	vec![
		Declaration::factory::<UserFactory>(),
		Declaration::factory::<AdminFactory>(),
		Declaration::factory::<PostFactory>(),
		Declaration::factory::<TagFactory>(),
		Declaration::static_fixture::<PostsFixture>(),
		Declaration::static_fixture::<UsersFixture>(),
		Declaration::static_fixture::<TagsFixture>(),
		Declaration::dynamic_fixture::<PublishPost>(),
	]
}
