//! Text rendering of the board, one boxed card per order.

use crate::model::{Order, OrderId, OrderStatus};
use crate::render::CardRenderer;
use chrono::Local;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::warn;

const RULE: &str = "----------------------------------------";

/// Text lines of one order card.
///
/// Layout: time and status badge, service type, delivery contact block
/// (delivery only), item lines, pricing block, notes.
pub fn render_card(id: &OrderId, order: &Order) -> Vec<String> {
    let mut lines = Vec::new();

    let badge = match order.status {
        OrderStatus::Pending => "[NEW]",
        OrderStatus::Completed => "[DONE]",
    };
    let time = order.timestamp.with_timezone(&Local).format("%d/%m/%Y %H:%M");
    lines.push(format!("{time}  {badge}  #{id}"));
    lines.push(order.service_type.label().to_uppercase());

    if order.is_delivery() {
        if let Some(phone) = order
            .phone_number
            .as_deref()
            .filter(|p| !p.trim().is_empty() && *p != "Non fourni")
        {
            lines.push(format!("Phone: {phone}"));
        }
        if let Some(address) = order.address() {
            lines.push(format!("Address: {address}"));
        }
        if let Some(distance) = order.distance_km.filter(|d| *d > 0.0) {
            lines.push(format!("Distance: {distance} km"));
        }
    }

    for item in &order.items {
        lines.push(format!(
            "  {}x {:<28}{:>7.2}€",
            item.quantity, item.name, item.unit_total
        ));
    }

    lines.push(format!("Subtotal{:>31.2}€", order.subtotal));
    if order.is_delivery() {
        if order.delivery_fee_waived {
            lines.push(format!("Delivery fee (waived){:>18.2}€", 0.0));
        } else if order.delivery_fee > 0.0 {
            lines.push(format!("Delivery fee{:>26}€", format!("+{:.2}", order.delivery_fee)));
        }
    }
    lines.push(format!("TOTAL{:>34.2}€", order.total));

    if let Some(notes) = order.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("Notes: {notes}"));
    }
    lines
}

struct Card {
    id: OrderId,
    lines: Vec<String>,
    inserted_at: Option<Instant>,
}

/// Draws the whole board to `out` at the end of every pass.
///
/// Cards inserted after the first draw carry a `*` marker for the configured
/// highlight window.
pub struct TerminalRenderer<W: Write> {
    out: W,
    cards: Vec<Card>,
    empty: bool,
    clear_screen: bool,
    highlight: Duration,
    draws: u64,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout()).with_clear_screen(true)
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cards: Vec::new(),
            empty: false,
            clear_screen: false,
            highlight: Duration::ZERO,
            draws: 0,
        }
    }

    /// Move the cursor home and clear the screen before each draw.
    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    pub fn with_highlight(mut self, window: Duration) -> Self {
        self.highlight = window;
        self
    }

    pub fn card_ids(&self) -> Vec<OrderId> {
        self.cards.iter().map(|card| card.id.clone()).collect()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self) -> io::Result<()> {
        if self.clear_screen {
            write!(self.out, "\x1B[H\x1B[0J")?;
        }
        writeln!(self.out, "ORDERS ({})", self.cards.len())?;
        writeln!(self.out, "{RULE}")?;

        if self.empty {
            writeln!(self.out, "Waiting for orders...")?;
            writeln!(self.out, "New orders will show up here automatically.")?;
        }
        for card in &self.cards {
            let fresh = card
                .inserted_at
                .is_some_and(|at| at.elapsed() < self.highlight);
            for (n, line) in card.lines.iter().enumerate() {
                let marker = if fresh && n == 0 { "* " } else { "  " };
                writeln!(self.out, "{marker}{line}")?;
            }
            writeln!(self.out, "{RULE}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> CardRenderer for TerminalRenderer<W> {
    fn insert_card_at(&mut self, id: &OrderId, order: &Order, after: Option<&OrderId>) {
        let slot = after
            .and_then(|a| self.cards.iter().position(|card| &card.id == a))
            .map_or(0, |p| p + 1);
        let inserted_at = (self.draws > 0 && !self.highlight.is_zero()).then(Instant::now);
        self.cards.insert(
            slot,
            Card {
                id: id.clone(),
                lines: render_card(id, order),
                inserted_at,
            },
        );
    }

    fn replace_card(&mut self, id: &OrderId, order: &Order) {
        if let Some(card) = self.cards.iter_mut().find(|card| &card.id == id) {
            card.lines = render_card(id, order);
        }
    }

    fn remove_card(&mut self, id: &OrderId) {
        self.cards.retain(|card| &card.id != id);
    }

    fn show_empty_state(&mut self) {
        self.empty = true;
    }

    fn hide_empty_state(&mut self) {
        self.empty = false;
    }

    fn commit(&mut self) {
        if let Err(e) = self.draw() {
            warn!(error = %e, "Failed to draw board");
        }
        self.draws += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineItem, ServiceType};
    use chrono::{TimeZone, Utc};

    fn delivery_order() -> Order {
        let mut order = Order::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            vec![LineItem::new("Menu Mixte", 1, 9.5)],
            9.5,
        );
        order.service_type = ServiceType::Delivery;
        order.phone_number = Some("Non fourni".to_string());
        order.delivery_address = Some("2 place Metezeau".to_string());
        order.delivery_fee_waived = true;
        order.notes = Some("extra spicy".to_string());
        order
    }

    #[test]
    fn test_card_layout_for_delivery() {
        let lines = render_card(&OrderId::from("o1"), &delivery_order());

        assert!(lines[0].contains("[NEW]") && lines[0].ends_with("#o1"));
        assert_eq!(lines[1], "DELIVERY");
        assert!(!lines.iter().any(|l| l.starts_with("Phone")), "placeholder phone is hidden");
        assert!(lines.contains(&"Address: 2 place Metezeau".to_string()));
        assert!(lines.iter().any(|l| l.contains("1x Menu Mixte") && l.ends_with("9.50€")));
        assert!(lines.iter().any(|l| l.starts_with("Delivery fee (waived)")));
        assert_eq!(lines.last().unwrap(), "Notes: extra spicy");
    }

    #[test]
    fn test_dine_in_card_has_no_delivery_block() {
        let mut order = delivery_order();
        order.service_type = ServiceType::DineIn;
        order.status = OrderStatus::Completed;
        let lines = render_card(&OrderId::from("o2"), &order);

        assert!(lines[0].contains("[DONE]"));
        assert!(!lines.iter().any(|l| l.starts_with("Address") || l.starts_with("Delivery")));
    }

    #[test]
    fn test_draws_cards_in_display_order() {
        let order = delivery_order();
        let mut renderer = TerminalRenderer::new(Vec::new());

        renderer.hide_empty_state();
        renderer.insert_card_at(&"b".into(), &order, None);
        renderer.insert_card_at(&"a".into(), &order, None);
        renderer.insert_card_at(&"c".into(), &order, Some(&"b".into()));
        renderer.remove_card(&"a".into());
        renderer.commit();

        assert_eq!(renderer.card_ids(), vec![OrderId::from("b"), OrderId::from("c")]);
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.starts_with("ORDERS (2)"));
        assert!(text.find("#b").unwrap() < text.find("#c").unwrap());
    }

    #[test]
    fn test_empty_state_message() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.show_empty_state();
        renderer.commit();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.contains("Waiting for orders..."));
    }
}
