//! FOLIO Test Utilities
//!
//! Shared test infrastructure for the FOLIO workspace:
//! - Proptest generators for IDs, roles and entities
//! - A seeded in-memory universe with one member per role
//! - `.docx` archive builders for importer tests
//! - Assertions on FOLIO error variants

pub use folio_core::{
    AccessError, Action, EntityIdType, EntityKind, FolioError, FolioResult, Membership, Page,
    PageId, Role, StorageError, Universe, UniverseId, UserId, World, WorldId,
};
pub use folio_storage::{InMemoryStore, WikiStore};

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for FOLIO types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::new)
    }

    pub fn arb_universe_id() -> impl Strategy<Value = UniverseId> {
        arb_uuid().prop_map(UniverseId::new)
    }

    pub fn arb_world_id() -> impl Strategy<Value = WorldId> {
        arb_uuid().prop_map(WorldId::new)
    }

    pub fn arb_page_id() -> impl Strategy<Value = PageId> {
        arb_uuid().prop_map(PageId::new)
    }

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Owner), Just(Role::Gm), Just(Role::Viewer)]
    }

    pub fn arb_action() -> impl Strategy<Value = Action> {
        proptest::sample::select(Action::ALL.to_vec())
    }

    /// Names that pass entity validation (non-blank, within limits).
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 '-]{0,40}"
    }

    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ,.'-]{0,80}"
    }

    pub fn arb_category() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("general".to_string()),
            Just("npc".to_string()),
            Just("location".to_string()),
            Just("faction".to_string()),
            Just("session".to_string()),
        ]
    }

    /// Simple HTML bodies.
    pub fn arb_content() -> impl Strategy<Value = String> {
        proptest::collection::vec("[A-Za-z ]{1,40}", 0..4)
            .prop_map(|paras| paras.iter().map(|p| format!("<p>{}</p>", p)).collect())
    }

    pub fn arb_page(world_id: WorldId, author_id: UserId) -> impl Strategy<Value = Page> {
        (arb_title(), arb_content(), arb_category(), any::<bool>()).prop_filter_map(
            "page must validate",
            move |(title, content, category, is_public)| {
                Page::new(world_id, title, Some(content), Some(category), author_id, is_public).ok()
            },
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! A ready-made universe for permission and API tests.

    use super::*;

    /// One universe, one world, a member per role, and a public and a
    /// private page authored by the GM.
    #[derive(Clone)]
    pub struct SeededUniverse {
        pub store: InMemoryStore,
        pub universe: Universe,
        pub world: World,
        pub owner: UserId,
        pub gm: UserId,
        pub viewer: UserId,
        pub public_page: Page,
        pub private_page: Page,
    }

    impl SeededUniverse {
        pub fn user_for(&self, role: Role) -> UserId {
            match role {
                Role::Owner => self.owner,
                Role::Gm => self.gm,
                Role::Viewer => self.viewer,
            }
        }
    }

    /// Seed a fresh [`InMemoryStore`].
    pub async fn seeded_universe() -> FolioResult<SeededUniverse> {
        seed_into(InMemoryStore::new(), "Eberron").await
    }

    /// Seed another universe into an existing store.
    pub async fn seed_into(store: InMemoryStore, name: &str) -> FolioResult<SeededUniverse> {
        let owner = UserId::now_v7();
        let gm = UserId::now_v7();
        let viewer = UserId::now_v7();

        let universe = Universe::new(name, Some(format!("{} campaign setting", name)), owner)?;
        store
            .universe_create(
                &universe,
                &Membership::new(universe.universe_id, owner, Role::Owner),
            )
            .await?;
        store
            .membership_add(&Membership::new(universe.universe_id, gm, Role::Gm))
            .await?;
        store
            .membership_add(&Membership::new(universe.universe_id, viewer, Role::Viewer))
            .await?;

        let world = World::new(universe.universe_id, "Khorvaire", None, "D&D 5e", Some(gm))?;
        store.world_create(&world).await?;

        let public_page = Page::new(
            world.world_id,
            "Sharn",
            Some("<p>The City of Towers.</p>".to_string()),
            Some("location".to_string()),
            gm,
            true,
        )?;
        store.page_create(&public_page).await?;

        let private_page = Page::new(
            world.world_id,
            "The Lord of Blades",
            Some("<p>Secret plans.</p>".to_string()),
            Some("npc".to_string()),
            gm,
            false,
        )?;
        store.page_create(&private_page).await?;

        Ok(SeededUniverse {
            store,
            universe,
            world,
            owner,
            gm,
            viewer,
            public_page,
            private_page,
        })
    }
}

// ============================================================================
// DOCX BUILDERS
// ============================================================================

pub mod docx {
    //! Minimal `.docx` archives built in memory.

    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Wrap paragraph XML in a `w:document`/`w:body` envelope.
    pub fn document_xml(body: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                "<w:body>{}</w:body></w:document>"
            ),
            body
        )
    }

    /// Zip arbitrary `(path, contents)` entries.
    pub fn build_zip(entries: &[(&str, &str)]) -> zip::result::ZipResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, contents) in entries {
            writer.start_file(*path, SimpleFileOptions::default())?;
            writer.write_all(contents.as_bytes())?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// A `.docx` with the given `word/document.xml`.
    pub fn build_docx(document_xml: &str) -> zip::result::ZipResult<Vec<u8>> {
        build_zip(&[
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
            ),
            ("word/document.xml", document_xml),
        ])
    }

    /// One-paragraph-per-entry document: `(style, text)`.
    pub fn simple_docx(paragraphs: &[(Option<&str>, &str)]) -> zip::result::ZipResult<Vec<u8>> {
        let body: String = paragraphs
            .iter()
            .map(|(style, text)| {
                let props = style
                    .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, s))
                    .unwrap_or_default();
                format!("<w:p>{}<w:r><w:t>{}</w:t></w:r></w:p>", props, text)
            })
            .collect();
        build_docx(&document_xml(&body))
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on FOLIO error variants.

    use super::*;

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &FolioResult<T>, entity: EntityKind) {
        match result {
            Err(FolioError::Storage(StorageError::NotFound { entity: e, .. })) => {
                assert_eq!(*e, entity, "Wrong entity kind in NotFound error");
            }
            other => panic!("Expected NotFound({:?}), got: {:?}", entity, other),
        }
    }

    #[track_caller]
    pub fn assert_denied<T: std::fmt::Debug>(result: &FolioResult<T>) {
        match result {
            Err(FolioError::Access(AccessError::Denied { .. })) => {}
            other => panic!("Expected Denied, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_not_a_member<T: std::fmt::Debug>(result: &FolioResult<T>) {
        match result {
            Err(FolioError::Access(AccessError::NotAMember { .. })) => {}
            other => panic!("Expected NotAMember, got: {:?}", other),
        }
    }
}
