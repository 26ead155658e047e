use rust_decimal::Decimal;

use crate::domain::checkout::OrderDraft;
use crate::domain::money::format_usd;

pub const RECEIPT_SUBJECT: &str = "Order Receipt | SellBetter";
const SUPPORT_EMAIL: &str = "support@sellbetter.com";
const ACCENT: &str = "#EE519F";

#[derive(Debug, Clone)]
pub struct ReceiptInput<'a> {
    pub lines: &'a [OrderDraft],
    pub total_amount: Decimal,
    /// Storefront link shown in the footer.
    pub store_url: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn render_receipt(input: &ReceiptInput<'_>) -> RenderedEmail {
    RenderedEmail {
        subject: RECEIPT_SUBJECT.to_string(),
        html: render_html(input),
        text: render_text(input),
    }
}

fn render_html(input: &ReceiptInput<'_>) -> String {
    let mut rows = String::new();
    for line in input.lines {
        let image = line
            .image_url
            .as_deref()
            .map(|url| {
                format!(
                    r#"<img src="{}" width="80" height="80" alt="{}" style="border-radius:4px;border:1px solid #e6e6e6" />"#,
                    escape_html(url),
                    escape_html(&line.title)
                )
            })
            .unwrap_or_default();
        let download = line
            .product_url
            .as_deref()
            .map(|url| {
                format!(
                    r#"<p style="margin:0"><a href="{}" style="color:{ACCENT};text-decoration:none;font-weight:500">Download Product</a></p>"#,
                    escape_html(url)
                )
            })
            .unwrap_or_default();
        let quantity = if line.quantity > 1 {
            format!(
                r#"<p style="margin:0 0 4px;color:#666666;font-size:14px">Quantity: {}</p>"#,
                line.quantity
            )
        } else {
            String::new()
        };
        let line_total = if line.quantity > 1 {
            format!(
                r#"<p style="margin:4px 0 0;color:#666666;font-size:14px">Total: {}</p>"#,
                format_usd(line.total_price)
            )
        } else {
            String::new()
        };

        rows.push_str(&format!(
            r#"<tr>
<td style="width:80px;vertical-align:top">{image}</td>
<td style="padding-left:16px;vertical-align:top">
<p style="margin:0 0 4px;font-size:16px;font-weight:500;color:#1a1a1a">{title}</p>
<p style="margin:0 0 4px;font-size:14px;color:#666666">{category}</p>
{download}
</td>
<td style="text-align:right;vertical-align:top">{quantity}<p style="margin:0;font-size:16px;font-weight:500">{price}</p>{line_total}</td>
</tr>
"#,
            title = escape_html(&line.title),
            category = escape_html(&line.category),
            price = format_usd(line.price),
        ));
    }

    let store_link = match input.store_url {
        Some(url) => format!(
            r#"<a href="{}" style="color:{ACCENT};text-decoration:none;font-weight:500">SellBetter</a>"#,
            escape_html(url)
        ),
        None => "SellBetter".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8" /><title>{subject}</title></head>
<body style="background-color:#ffffff;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif">
<div style="margin:0 auto;padding:24px;max-width:600px">
<h1 style="text-align:center;font-size:24px;color:#1a1a1a">Thanks for your purchase!</h1>
<p style="text-align:center;color:#666666">Here's what you ordered:</p>
<hr style="border-color:#e6e6e6" />
<h2 style="font-size:18px;color:#1a1a1a">Order Details</h2>
<table width="100%" cellpadding="0" cellspacing="0">
{rows}</table>
<hr style="border-color:#e6e6e6" />
<p style="text-align:right;font-size:18px;font-weight:600">Total Amount: <span style="color:{ACCENT}">{total}</span></p>
<hr style="border-color:#e6e6e6" />
<p style="text-align:center;font-size:12px;color:#666666">We're thrilled to have you with us! Visit {store_link} to explore more.</p>
<div style="padding:16px 0;background-color:#f9f9f9;border-radius:4px;text-align:center">
<p style="font-size:16px;font-weight:600;margin:0 0 8px">Need Help?</p>
<p style="font-size:14px;color:#666666;margin:4px 0">Email: {SUPPORT_EMAIL}</p>
</div>
</div>
</body>
</html>
"#,
        subject = escape_html(RECEIPT_SUBJECT),
        total = format_usd(input.total_amount),
    )
}

fn render_text(input: &ReceiptInput<'_>) -> String {
    let mut out = String::from("Thanks for your purchase!\n\nOrder Details\n\n");
    for line in input.lines {
        out.push_str(&format!(
            "{} ({})\n  {} x {} = {}\n",
            line.title,
            line.category,
            format_usd(line.price),
            line.quantity,
            format_usd(line.total_price)
        ));
        if let Some(url) = &line.product_url {
            out.push_str(&format!("  Download: {url}\n"));
        }
    }
    out.push_str(&format!(
        "\nTotal Amount: {}\n\nNeed help? Email {SUPPORT_EMAIL}\n",
        format_usd(input.total_amount)
    ));
    out
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
