//! Chat message texts (HTML parse mode).

use std::fmt::Write;

use domain::{DeliveryType, Order};

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Title of the order-created notification.
pub const ORDER_CREATED_TITLE: &str = "Нове замовлення";

fn delivery_label(delivery: DeliveryType) -> &'static str {
    match delivery {
        DeliveryType::PostOffice => "Нова пошта",
        DeliveryType::Courier => "Кур'єрська доставка",
        DeliveryType::Address => "За адресою",
    }
}

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Formats the summary sent to staff when an order is placed.
pub fn format_order_created(order: &Order) -> String {
    let customer = order.customer_info();
    let delivery = order.delivery_info();
    let total = order.total_amount();

    let mut text = String::from("🆕 <b>Нове замовлення!</b>\n\n");
    // Writing into a String cannot fail.
    let _ = writeln!(text, "📋 <b>Номер:</b> {}", escape_html(order.order_number()));
    let _ = writeln!(
        text,
        "💰 <b>Сума:</b> {} {}",
        total.amount,
        escape_html(&total.currency)
    );
    let _ = writeln!(
        text,
        "📅 <b>Дата:</b> {}",
        order.created_at().format(DATE_FORMAT)
    );

    let name = customer.display_name();
    if !name.is_empty() {
        let _ = writeln!(text, "👤 <b>Клієнт:</b> {}", escape_html(&name));
    }
    if !customer.phone.is_empty() {
        let _ = writeln!(text, "📱 <b>Телефон:</b> {}", escape_html(&customer.phone));
    }

    let _ = writeln!(
        text,
        "🚚 <b>Доставка:</b> {}",
        delivery_label(delivery.delivery_type)
    );
    let _ = writeln!(
        text,
        "🌍 <b>Місто:</b> {}, {}",
        escape_html(&delivery.city),
        escape_html(&delivery.country)
    );
    if let Some(ref post_office) = delivery.post_office {
        let _ = writeln!(text, "📦 <b>Відділення:</b> {}", escape_html(post_office));
    }
    if let Some(ref address) = delivery.address {
        let _ = writeln!(text, "🏠 <b>Адреса:</b> {}", escape_html(address));
    }

    let _ = writeln!(text, "\n📦 <b>Товарів:</b> {} шт.", order.item_count());

    if !order.notes().is_empty() {
        let _ = writeln!(text, "\n💭 <b>Примітки:</b> {}", escape_html(order.notes()));
    }
    text
}
