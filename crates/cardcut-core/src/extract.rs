//! Per-card sheet prefetch and face extraction.
//!
//! Every pass walks a tree twice: first [`Extractor::prefetch`] on every card
//! so that all sheets the pass needs are cached (any fetch failure aborts the
//! run), then [`Extractor::extract`] on every card, where errors stay local to
//! the card that caused them.

use crate::grid::{cell_rect, deck_id, grid_index, GeometryError, GridSpec};
use crate::CoreError;
use cardcut_remote::{ensure_sprite, Fetcher};
use cardcut_schema::{CardIdentity, ObjectNode, SheetDescriptor, LOCATION_TAG};
use cardcut_store::{CardStore, SpriteCache, StoreError};
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::Serialize;
use std::cell::RefCell;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Which tree a pass walks. Back sheets of encounter locations are always
/// prefetched; player cards only fetch backs that are unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    PlayerCards,
    Encounter,
}

/// Why a single card could not be extracted.
#[derive(Debug, Error)]
pub enum CardError {
    #[error("card has no CustomDeck entry")]
    NoSheet,
    #[error("card has no CardID")]
    NoCardId,
    #[error("sheet {url} is not cached at {}", path.display())]
    SheetNotCached { url: String, path: PathBuf },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Typed view of a card node: the fields extraction reads, resolved once.
#[derive(Debug, Clone)]
pub struct CardNode<'a> {
    pub node: &'a ObjectNode,
    /// `None` when `GMNotes` holds no usable metadata.
    pub id: Option<CardIdentity>,
    pub card_id: Option<u64>,
    pub sideways: bool,
    pub location: bool,
}

impl<'a> CardNode<'a> {
    pub fn from_node(node: &'a ObjectNode) -> Self {
        Self {
            node,
            id: node.card_identity(),
            card_id: node.card_id,
            sideways: node.sideways_card,
            location: node.has_tag(LOCATION_TAG),
        }
    }

    /// The sheet this card is printed on.
    ///
    /// The `CustomDeck` key naming the card's deck (`CardID / 100`) wins;
    /// without a match the first entry as written in the document is used,
    /// which covers the usual single-entry table.
    pub fn sheet(&self) -> Option<&'a SheetDescriptor> {
        let deck = &self.node.custom_deck;
        self.card_id
            .and_then(|cid| deck.get(&deck_id(cid).to_string()))
            .or_else(|| deck.first())
    }

    pub fn grid_index(&self) -> Option<u32> {
        self.card_id.map(grid_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceOutcome {
    Written(PathBuf),
    /// Output already present; nothing was decoded or written.
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    SkippedNoId,
    Extracted {
        id: CardIdentity,
        faces: Vec<FaceOutcome>,
    },
    Failed {
        id: CardIdentity,
        reason: String,
    },
}

/// Per-pass tallies. Faces are counted for written/existing, cards for
/// skipped/failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    pub cards: usize,
    pub written: usize,
    pub existing: usize,
    pub skipped: usize,
    pub failed: usize,
    pub sheets_fetched: usize,
}

impl ExtractReport {
    pub fn record(&mut self, outcome: &ExtractOutcome) {
        self.cards += 1;
        match outcome {
            ExtractOutcome::SkippedNoId => self.skipped += 1,
            ExtractOutcome::Failed { .. } => self.failed += 1,
            ExtractOutcome::Extracted { faces, .. } => {
                for face in faces {
                    match face {
                        FaceOutcome::Written(_) => self.written += 1,
                        FaceOutcome::Existing => self.existing += 1,
                    }
                }
            }
        }
    }

    pub fn merge(&mut self, other: &ExtractReport) {
        self.cards += other.cards;
        self.written += other.written;
        self.existing += other.existing;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.sheets_fetched += other.sheets_fetched;
    }
}

pub struct Extractor<'a> {
    sprites: &'a SpriteCache,
    cards: &'a CardStore,
    fetcher: &'a dyn Fetcher,
    pass: PassKind,
    // Consecutive cards usually share a sheet; keep the last decode around.
    last_sheet: RefCell<Option<(PathBuf, Rc<DynamicImage>)>>,
}

impl<'a> Extractor<'a> {
    pub fn new(
        sprites: &'a SpriteCache,
        cards: &'a CardStore,
        fetcher: &'a dyn Fetcher,
        pass: PassKind,
    ) -> Self {
        Self {
            sprites,
            cards,
            fetcher,
            pass,
            last_sheet: RefCell::new(None),
        }
    }

    /// Make sure every sheet `node` will need is in the sprite cache.
    ///
    /// Returns how many sheets were downloaded. A card without a sheet is
    /// left for [`extract`](Self::extract) to report.
    pub fn prefetch(&self, node: &ObjectNode) -> Result<usize, CoreError> {
        let card = CardNode::from_node(node);
        let Some(sheet) = card.sheet() else {
            debug!("card '{}' has no sheet to prefetch", node.nickname);
            return Ok(0);
        };

        let mut fetched = 0;
        if ensure_sprite(self.sprites, self.fetcher, &sheet.face_url)?.fetched {
            fetched += 1;
        }
        let wants_back =
            sheet.unique_back || (self.pass == PassKind::Encounter && card.location);
        if wants_back && ensure_sprite(self.sprites, self.fetcher, &sheet.back_url)?.fetched {
            fetched += 1;
        }
        Ok(fetched)
    }

    /// Cut the card's face (and unique back) out of the cached sheets.
    ///
    /// Never fails the run: problems are logged and reported as
    /// [`ExtractOutcome::Failed`].
    pub fn extract(&self, node: &ObjectNode) -> ExtractOutcome {
        let card = CardNode::from_node(node);
        let Some(id) = card.id.clone() else {
            let name = if node.nickname.is_empty() {
                "<unnamed>"
            } else {
                node.nickname.as_str()
            };
            warn!("skipping card '{name}': no id in GMNotes");
            return ExtractOutcome::SkippedNoId;
        };

        match self.extract_faces(&card, &id) {
            Ok(faces) => ExtractOutcome::Extracted { id, faces },
            Err(e) => {
                warn!("failed to extract card {id}: {e}");
                ExtractOutcome::Failed {
                    id,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn extract_faces(
        &self,
        card: &CardNode<'_>,
        id: &CardIdentity,
    ) -> Result<Vec<FaceOutcome>, CardError> {
        let sheet = card.sheet().ok_or(CardError::NoSheet)?;
        let index = card.grid_index().ok_or(CardError::NoCardId)?;
        let grid = GridSpec::new(sheet.num_width, sheet.num_height);

        let mut faces = vec![self.extract_face(card, id, &sheet.face_url, grid, index)?];
        if sheet.unique_back {
            faces.push(self.extract_face(card, &id.back(), &sheet.back_url, grid, index)?);
        }
        Ok(faces)
    }

    fn extract_face(
        &self,
        card: &CardNode<'_>,
        out: &CardIdentity,
        url: &str,
        grid: GridSpec,
        index: u32,
    ) -> Result<FaceOutcome, CardError> {
        if self.cards.exists(out)? {
            debug!("card {out} already extracted");
            return Ok(FaceOutcome::Existing);
        }

        let path = self.sprites.path_for(url);
        if !path.is_file() {
            return Err(CardError::SheetNotCached {
                url: url.to_owned(),
                path,
            });
        }
        let sheet = self.load_sheet(&path)?;
        let rect = cell_rect(sheet.width(), sheet.height(), grid, index)?;

        let mut face = sheet.crop_imm(rect.x, rect.y, rect.width, rect.height);
        if card.sideways {
            face = face.rotate270();
        }

        let mut png = Vec::new();
        face.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        let written = self.cards.put(out, &png)?;
        info!("extracted {}", written.display());
        Ok(FaceOutcome::Written(written))
    }

    fn load_sheet(&self, path: &Path) -> Result<Rc<DynamicImage>, CardError> {
        if let Some((cached, image)) = self.last_sheet.borrow().as_ref() {
            if cached == path {
                return Ok(Rc::clone(image));
            }
        }
        // Cache entries are named .jpg whatever they hold; sniff the bytes.
        let image = Rc::new(ImageReader::open(path)?.with_guessed_format()?.decode()?);
        *self.last_sheet.borrow_mut() = Some((path.to_path_buf(), Rc::clone(&image)));
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardcut_remote::MemoryFetcher;
    use cardcut_schema::CustomDeck;
    use cardcut_store::DataLayout;
    use image::{GenericImageView, Rgb, RgbImage};

    const FACE: &str = "http://sheets.example.com/face.png";
    const BACK: &str = "http://sheets.example.com/back.png";

    struct Fixture {
        dir: tempfile::TempDir,
        sprites: SpriteCache,
        cards: CardStore,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.initialize().unwrap();
        Fixture {
            dir,
            sprites: SpriteCache::new(layout.clone()),
            cards: CardStore::new(layout),
        }
    }

    /// A `cols × rows` sheet where cell `i` is filled with gray level `i * 10 + base`.
    fn sheet_png(width: u32, height: u32, cols: u32, rows: u32, base: u8) -> Vec<u8> {
        let (cw, ch) = (width / cols, height / rows);
        let img = RgbImage::from_fn(width, height, |x, y| {
            let col = (x / cw).min(cols - 1);
            let row = (y / ch).min(rows - 1);
            let level = base.wrapping_add(((row * cols + col) * 10) as u8);
            Rgb([level, level, level])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn card(id: &str, card_id: u64, unique_back: bool) -> ObjectNode {
        let mut deck = CustomDeck::default();
        deck.insert(
            (card_id / 100).to_string(),
            SheetDescriptor {
                face_url: FACE.to_owned(),
                back_url: BACK.to_owned(),
                unique_back,
                num_width: 3,
                num_height: 2,
            },
        );
        ObjectNode {
            name: "Card".to_owned(),
            nickname: format!("card {id}"),
            tags: vec!["PlayerCard".to_owned()],
            gm_notes: format!(r#"{{"id":"{id}"}}"#),
            custom_deck: deck,
            card_id: Some(card_id),
            ..ObjectNode::default()
        }
    }

    fn fetcher() -> MemoryFetcher {
        MemoryFetcher::new()
            .with(FACE, &sheet_png(300, 200, 3, 2, 0))
            .with(BACK, &sheet_png(300, 200, 3, 2, 100))
    }

    fn pixel(path: &Path) -> (u32, u32, u8) {
        let img = image::open(path).unwrap();
        let Rgb([level, _, _]) = img.to_rgb8().get_pixel(0, 0).to_owned();
        (img.width(), img.height(), level)
    }

    #[test]
    fn sheet_prefers_matching_deck_key() {
        let mut node = card("01001", 12303, false);
        node.custom_deck.insert(
            "1".to_owned(),
            SheetDescriptor {
                face_url: "http://other".to_owned(),
                ..SheetDescriptor::default()
            },
        );
        let view = CardNode::from_node(&node);
        assert_eq!(view.sheet().unwrap().face_url, FACE);
        assert_eq!(view.grid_index(), Some(3));
    }

    #[test]
    fn sheet_falls_back_to_first_entry_in_document_order() {
        let mut node = card("01001", 12303, false);
        let descriptor = node.custom_deck["123"].clone();
        let mut deck = CustomDeck::default();
        deck.insert("9", descriptor);
        deck.insert(
            "1",
            SheetDescriptor {
                face_url: "http://other".to_owned(),
                ..SheetDescriptor::default()
            },
        );
        node.custom_deck = deck;
        assert_eq!(CardNode::from_node(&node).sheet().unwrap().face_url, FACE);
    }

    #[test]
    fn prefetch_face_only_for_shared_back() {
        let fx = fixture();
        let fetcher = fetcher();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);

        assert_eq!(ex.prefetch(&card("01001", 12303, false)).unwrap(), 1);
        assert_eq!(fetcher.calls(), vec![FACE]);
    }

    #[test]
    fn prefetch_unique_back_fetches_both() {
        let fx = fixture();
        let fetcher = fetcher();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);

        assert_eq!(ex.prefetch(&card("01001", 12303, true)).unwrap(), 2);
        assert_eq!(ex.prefetch(&card("01002", 12304, true)).unwrap(), 0);
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[test]
    fn prefetch_location_back_only_in_encounter_pass() {
        let mut node = card("02001", 12300, false);
        node.tags.push(LOCATION_TAG.to_owned());

        let fx = fixture();
        let fetcher = fetcher();
        let player = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        player.prefetch(&node).unwrap();
        assert_eq!(fetcher.fetch_count_for(BACK), 0);

        let encounter = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::Encounter);
        encounter.prefetch(&node).unwrap();
        assert_eq!(fetcher.fetch_count_for(BACK), 1);
    }

    #[test]
    fn prefetch_failure_is_fatal() {
        let fx = fixture();
        let fetcher = MemoryFetcher::new();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        assert!(matches!(
            ex.prefetch(&card("01001", 12303, false)),
            Err(CoreError::Remote(_))
        ));
    }

    #[test]
    fn extract_writes_face_from_grid_cell() {
        let fx = fixture();
        let fetcher = fetcher();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        let node = card("01001", 12304, false);
        ex.prefetch(&node).unwrap();

        let outcome = ex.extract(&node);
        let path = fx.cards.path_for(&CardIdentity::new("01001")).unwrap();
        assert_eq!(
            outcome,
            ExtractOutcome::Extracted {
                id: CardIdentity::new("01001"),
                faces: vec![FaceOutcome::Written(path.clone())],
            }
        );
        // index 4 in a 3x2 grid is row 1, col 1
        assert_eq!(pixel(&path), (100, 100, 40));
        assert!(!fx.cards.exists(&CardIdentity::new("01001b")).unwrap());
    }

    #[test]
    fn extract_unique_back_uses_same_index_on_back_sheet() {
        let fx = fixture();
        let fetcher = fetcher();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        let node = card("01001", 12303, true);
        ex.prefetch(&node).unwrap();
        ex.extract(&node);

        let front = fx.cards.path_for(&CardIdentity::new("01001")).unwrap();
        let back = fx.cards.path_for(&CardIdentity::new("01001b")).unwrap();
        assert_eq!(pixel(&front).2, 30);
        assert_eq!(pixel(&back).2, 130);
    }

    #[test]
    fn extract_sideways_swaps_dimensions() {
        let fx = fixture();
        let fetcher = MemoryFetcher::new().with(FACE, &sheet_png(300, 120, 3, 2, 0));
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::Encounter);
        let mut node = card("03001", 12300, false);
        node.sideways_card = true;
        ex.prefetch(&node).unwrap();
        ex.extract(&node);

        let path = fx.cards.path_for(&CardIdentity::new("03001")).unwrap();
        let img = image::open(path).unwrap();
        assert_eq!(img.dimensions(), (60, 100));
    }

    #[test]
    fn extract_skips_card_without_id() {
        let fx = fixture();
        let fetcher = fetcher();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        let mut node = card("x", 12300, false);
        node.gm_notes = String::new();

        assert_eq!(ex.extract(&node), ExtractOutcome::SkippedNoId);
        assert!(fx.cards.list().unwrap().is_empty());
    }

    #[test]
    fn extract_rejects_id_that_escapes_cards_dir() {
        let fx = fixture();
        let fetcher = fetcher();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::Encounter);
        let node = card("../../escaped", 12300, false);
        ex.prefetch(&node).unwrap();

        match ex.extract(&node) {
            ExtractOutcome::Failed { reason, .. } => {
                assert!(reason.contains("invalid card id"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        let root = fx.dir.path();
        assert!(!root.join("escaped.png").exists());
        assert!(!root.parent().unwrap().join("escaped.png").exists());
        assert!(fx.cards.list().unwrap().is_empty());
    }

    #[test]
    fn extract_existing_output_is_untouched() {
        let fx = fixture();
        let fetcher = fetcher();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        let id = CardIdentity::new("01001");
        fx.cards.put(&id, b"already here").unwrap();

        // no prefetch: the sheet is never needed
        let outcome = ex.extract(&card("01001", 12303, false));
        assert_eq!(
            outcome,
            ExtractOutcome::Extracted {
                id: id.clone(),
                faces: vec![FaceOutcome::Existing],
            }
        );
        let written = std::fs::read(fx.cards.path_for(&id).unwrap()).unwrap();
        assert_eq!(written, b"already here");
    }

    #[test]
    fn extract_index_outside_grid_fails_without_output() {
        let fx = fixture();
        let fetcher = fetcher();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        let node = card("01009", 12309, false);
        ex.prefetch(&node).unwrap();

        match ex.extract(&node) {
            ExtractOutcome::Failed { id, reason } => {
                assert_eq!(id, "01009");
                assert!(reason.contains("outside"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!fx.cards.exists(&CardIdentity::new("01009")).unwrap());
    }

    #[test]
    fn extract_missing_sheet_fails() {
        let fx = fixture();
        let fetcher = MemoryFetcher::new();
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        assert!(matches!(
            ex.extract(&card("01001", 12303, false)),
            ExtractOutcome::Failed { .. }
        ));
    }

    #[test]
    fn extract_undecodable_sheet_fails() {
        let fx = fixture();
        let fetcher = MemoryFetcher::new().with(FACE, b"not an image");
        let ex = Extractor::new(&fx.sprites, &fx.cards, &fetcher, PassKind::PlayerCards);
        let node = card("01001", 12303, false);
        ex.prefetch(&node).unwrap();
        assert!(matches!(ex.extract(&node), ExtractOutcome::Failed { .. }));
        assert!(fx.cards.list().unwrap().is_empty());
    }

    #[test]
    fn report_counts_faces_and_cards() {
        let mut report = ExtractReport::default();
        report.record(&ExtractOutcome::SkippedNoId);
        report.record(&ExtractOutcome::Extracted {
            id: CardIdentity::new("a"),
            faces: vec![FaceOutcome::Written(PathBuf::from("a.png")), FaceOutcome::Existing],
        });
        report.record(&ExtractOutcome::Failed {
            id: CardIdentity::new("b"),
            reason: "bad".to_owned(),
        });

        assert_eq!(
            report,
            ExtractReport {
                cards: 3,
                written: 1,
                existing: 1,
                skipped: 1,
                failed: 1,
                sheets_fetched: 0,
            }
        );

        let mut total = ExtractReport::default();
        total.merge(&report);
        total.merge(&report);
        assert_eq!(total.cards, 6);
        assert_eq!(total.written, 2);
    }
}
