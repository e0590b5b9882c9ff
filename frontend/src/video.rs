use std::cell::RefCell;
use std::rc::Rc;

use url::Url;

use crate::config::ShellConfig;
use crate::env::{DomEvent, Element, Env, Handle, Intersection, IntersectionWatch, WatchOptions};
use crate::error::{Result, ShellError};

const AUTOPLAY: &str = "autoplay";
const OVERLAY_HIDDEN: &str = "hidden";

fn parse_src(src: &str) -> Result<Url> {
    if let Some(rest) = src.strip_prefix("//") {
        return Ok(Url::parse(&format!("https://{}", rest))?);
    }
    Ok(Url::parse(src)?)
}

fn has_autoplay(url: &Url) -> bool {
    url.query_pairs().any(|(k, v)| k == AUTOPLAY && v == "1")
}

fn rewrite_query(url: &mut Url, autoplay: bool) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != AUTOPLAY)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() && !autoplay {
        url.set_query(None);
        return;
    }
    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (key, value) in &kept {
        pairs.append_pair(key, value);
    }
    if autoplay {
        pairs.append_pair(AUTOPLAY, "1");
    }
}

/// Embed URL with exactly one `autoplay=1`. Unchanged if already present.
pub fn with_autoplay(src: &str) -> Result<String> {
    let mut url = parse_src(src)?;
    if has_autoplay(&url) {
        return Ok(src.to_string());
    }
    rewrite_query(&mut url, true);
    Ok(url.to_string())
}

/// Embed URL without any autoplay parameter. Unchanged if none present.
pub fn without_autoplay(src: &str) -> Result<String> {
    let mut url = parse_src(src)?;
    if !url.query_pairs().any(|(k, _)| k == AUTOPLAY) {
        return Ok(src.to_string());
    }
    rewrite_query(&mut url, false);
    Ok(url.to_string())
}

pub fn origin_of(src: &str) -> Result<String> {
    let url = parse_src(src)?;
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Ok(origin.ascii_serialization()),
        url::Origin::Opaque(_) => Err(ShellError::InvalidUrl(src.to_string())),
    }
}

struct VideoCard {
    card: Element,
    embed: Option<Element>,
    overlay: Option<Element>,
}

/// Lazy preconnect and click-to-play for embedded video cards.
pub struct VideoCardController {
    env: Env,
    cards: Vec<VideoCard>,
    watch: RefCell<Option<Rc<dyn IntersectionWatch>>>,
    listeners: RefCell<Vec<Handle>>,
}

impl VideoCardController {
    pub fn new(env: Env, config: &ShellConfig) -> Rc<Self> {
        let dom = &config.dom;
        let cards = env
            .query_all(&dom.video_card)
            .into_iter()
            .map(|card| VideoCard {
                embed: card.query(&dom.video_embed),
                overlay: card.query(&dom.video_overlay),
                card,
            })
            .collect();
        Rc::new(Self {
            env,
            cards,
            watch: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        })
    }

    pub fn init(self: &Rc<Self>) {
        if self.cards.is_empty() {
            return;
        }

        let this = Rc::downgrade(self);
        let watch = self.env.intersection_watch(
            WatchOptions {
                threshold: 0.0,
                root_margin: "200px 0px".to_string(),
            },
            Rc::new(move |entries| {
                if let Some(this) = this.upgrade() {
                    this.on_intersections(entries);
                }
            }),
        );
        match &watch {
            Some(watch) => self.cards.iter().for_each(|c| watch.observe(&c.card)),
            None => (0..self.cards.len()).for_each(|i| self.preconnect(i)),
        }
        *self.watch.borrow_mut() = watch;

        let mut listeners = self.listeners.borrow_mut();
        for (index, card) in self.cards.iter().enumerate() {
            if let Some(overlay) = &card.overlay {
                let this = Rc::downgrade(self);
                listeners.push(overlay.listen(
                    "click",
                    Rc::new(move |e: &DomEvent| {
                        e.prevent_default();
                        if let Some(this) = this.upgrade() {
                            if let Err(err) = this.play_video(index) {
                                log::warn!("video {} not started: {}", index, err);
                            }
                        }
                    }),
                ));
            }
            let this = Rc::downgrade(self);
            listeners.push(card.card.listen(
                "mouseenter",
                Rc::new(move |_: &DomEvent| {
                    if let Some(this) = this.upgrade() {
                        this.pause_others(index);
                    }
                }),
            ));
        }
    }

    fn on_intersections(&self, entries: Vec<Intersection>) {
        let watch = self.watch.borrow().clone();
        for entry in entries.into_iter().filter(|e| e.is_intersecting) {
            let Some(index) = self
                .cards
                .iter()
                .position(|c| c.card.same_node(entry.target.as_ref()))
            else {
                continue;
            };
            self.preconnect(index);
            if let Some(watch) = &watch {
                watch.unobserve(&entry.target);
            }
        }
    }

    /// Adds a preconnect hint for the card's video origin, once per origin.
    fn preconnect(&self, index: usize) {
        let Some(src) = self.cards[index].embed.as_ref().and_then(|e| e.attribute("src")) else {
            return;
        };
        let origin = match origin_of(&src) {
            Ok(origin) => origin,
            Err(e) => {
                log::debug!("no preconnect for card {}: {}", index, e);
                return;
            }
        };
        let Some(head) = self.env.head() else { return };
        let exists = head
            .query_all("link[rel='preconnect']")
            .iter()
            .any(|l| l.attribute("href").as_deref() == Some(origin.as_str()));
        if exists {
            return;
        }
        match self.env.create_element("link") {
            Ok(link) => {
                link.set_attribute("rel", "preconnect");
                link.set_attribute("href", &origin);
                link.set_attribute("crossorigin", "");
                if let Err(e) = head.append_child(&link) {
                    log::debug!("preconnect hint not added: {}", e);
                }
            }
            Err(e) => log::debug!("preconnect hint not created: {}", e),
        }
    }

    fn embed_src(&self, index: usize) -> Result<(Element, String)> {
        let embed = self
            .cards
            .get(index)
            .and_then(|c| c.embed.clone())
            .ok_or(ShellError::MissingElement("video embed"))?;
        let src = embed
            .attribute("src")
            .ok_or(ShellError::MissingElement("video embed src"))?;
        Ok((embed, src))
    }

    pub fn play_video(&self, index: usize) -> Result<()> {
        let (embed, src) = self.embed_src(index)?;
        let next = with_autoplay(&src)?;
        if next != src {
            embed.set_attribute("src", &next);
        }
        if let Some(overlay) = &self.cards[index].overlay {
            overlay.add_class(OVERLAY_HIDDEN);
        }
        Ok(())
    }

    pub fn pause_video(&self, index: usize) -> Result<()> {
        let (embed, src) = self.embed_src(index)?;
        let next = without_autoplay(&src)?;
        if next != src {
            embed.set_attribute("src", &next);
        }
        Ok(())
    }

    pub fn pause_others(&self, active: usize) {
        for index in (0..self.cards.len()).filter(|i| *i != active) {
            if let Err(e) = self.pause_video(index) {
                log::debug!("video {} not paused: {}", index, e);
            }
        }
    }

    pub fn destroy(&self) {
        if let Some(watch) = self.watch.borrow_mut().take() {
            watch.disconnect();
        }
        self.listeners.borrow_mut().clear();
    }
}
