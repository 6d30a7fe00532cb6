//! Service pricing table and the `get_ncs_pricing` tool

use super::{decode_arguments, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_CUSTOMER: &str = "new";
const DEFAULT_PACKAGE: &str = "regular";
const NOT_READY: &str = "ระบบราคายังไม่พร้อมใช้งาน กรุณาลองใหม่อีกครั้ง";

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("failed to read pricing config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse pricing config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct Named {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ItemConfig {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    sizes: BTreeMap<String, SizeConfig>,
}

/// `pricing[service][customer][package]`
type PriceGrid = BTreeMap<String, BTreeMap<String, BTreeMap<String, Price>>>;

#[derive(Debug, Clone, Deserialize)]
struct SizeConfig {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    pricing: PriceGrid,
}

impl SizeConfig {
    fn regular_price(&self, service: &str, customer: &str) -> Option<&Price> {
        self.pricing.get(service)?.get(customer)?.get(DEFAULT_PACKAGE)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Price {
    #[serde(default)]
    full_price: u64,
    #[serde(default)]
    discount_35: u64,
    #[serde(default)]
    discount_50: u64,
}

impl Price {
    fn parts(self, full_label: &str) -> Vec<String> {
        let mut parts = Vec::new();
        if self.full_price > 0 {
            parts.push(format!("{full_label}{} บาท", format_number(self.full_price)));
        }
        if self.discount_35 > 0 {
            parts.push(format!("ลด 35% = {} บาท", format_number(self.discount_35)));
        }
        if self.discount_50 > 0 {
            parts.push(format!("ลด 50% = {} บาท", format_number(self.discount_50)));
        }
        parts
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PackageConfig {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    /// Keyed by quantity
    #[serde(default)]
    disinfection: BTreeMap<String, PackagePrice>,
    #[serde(default)]
    washing: BTreeMap<String, PackagePrice>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct PackagePrice {
    full_price: u64,
    discount: u64,
    sale_price: u64,
    per_item: u64,
    #[serde(default)]
    deposit_min: u64,
}

/// Pricing configuration loaded from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct PricingTable {
    #[serde(default)]
    services: BTreeMap<String, Named>,
    #[serde(default)]
    items: BTreeMap<String, ItemConfig>,
    #[serde(default)]
    packages: BTreeMap<String, PackageConfig>,
    #[serde(default)]
    customer_types: BTreeMap<String, Named>,
}

/// Arguments of a pricing lookup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricingRequest {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub customer_type: String,
    #[serde(default)]
    pub package_type: String,
    #[serde(default)]
    pub quantity: u32,
}

/// Key whose own name or aliases match `input`, ignoring case and padding
fn find_key<'a, V>(
    map: &'a BTreeMap<String, V>,
    input: &str,
    aliases: impl Fn(&V) -> &[String],
) -> Option<&'a str> {
    let wanted = input.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    map.iter()
        .find(|(key, value)| {
            key.to_lowercase() == wanted
                || aliases(value).iter().any(|a| a.to_lowercase() == wanted)
        })
        .map(|(key, _)| key.as_str())
}

/// Group digits in thousands: `12500` becomes `12,500`
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl PricingTable {
    pub fn load(path: &Path) -> Result<Self, PricingError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PricingError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, PricingError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Human-readable quote for a request
    pub fn quote(&self, request: &PricingRequest) -> String {
        let service = find_key(&self.services, &request.service_type, |s| s.aliases.as_slice());
        let item = find_key(&self.items, &request.item_type, |i| i.aliases.as_slice());
        let customer = find_key(&self.customer_types, &request.customer_type, |c| {
            c.aliases.as_slice()
        })
        .unwrap_or(DEFAULT_CUSTOMER);
        let package = find_key(&self.packages, &request.package_type, |p| p.aliases.as_slice())
            .unwrap_or(DEFAULT_PACKAGE);

        tracing::debug!(?service, ?item, customer, package, "Resolved pricing keys");

        if package != DEFAULT_PACKAGE {
            return self.package_quote(service, package, request.quantity.max(1));
        }

        match (service, item) {
            (Some(service), Some(item)) => self.item_quote(service, item, &request.size, customer),
            _ => fallback(request),
        }
    }

    fn package_quote(&self, service: Option<&str>, package: &str, quantity: u32) -> String {
        let Some(pkg) = self.packages.get(package) else {
            return "ไม่พบข้อมูลแพคเพจที่ระบุ".to_string();
        };
        let service_name = match service {
            Some(key) => self.services.get(key).map_or("", |s| s.name.as_str()),
            None => "ทำความสะอาด",
        };

        let prices = match service {
            Some("disinfection") => Some(&pkg.disinfection),
            Some("washing") => Some(&pkg.washing),
            _ => None,
        };
        let Some(price) = prices.and_then(|p| p.get(&quantity.to_string())) else {
            return format!(
                "ไม่พบข้อมูลราคา{} {quantity} ใบ สำหรับบริการ{service_name}",
                pkg.name
            );
        };

        let mut text = format!(
            "{} {quantity} ใบ บริการ{service_name}: ราคาเต็ม {} บาท, ส่วนลด {} บาท, ราคาขาย {} บาท (เฉลี่ย {} บาท/ใบ)",
            pkg.name,
            format_number(price.full_price),
            format_number(price.discount),
            format_number(price.sale_price),
            format_number(price.per_item),
        );
        if price.deposit_min > 0 {
            let _ = write!(text, " มัดจำขั้นต่ำ {} บาท", format_number(price.deposit_min));
        }
        text
    }

    fn item_quote(&self, service: &str, item: &str, size: &str, customer: &str) -> String {
        let Some(item_cfg) = self.items.get(item) else {
            return "ไม่พบข้อมูลสินค้าที่ระบุ".to_string();
        };
        let service_name = self.services.get(service).map_or("", |s| s.name.as_str());
        let customer_name = self.customer_types.get(customer).map_or("", |c| c.name.as_str());

        let Some(size_key) = find_key(&item_cfg.sizes, size, |s| s.aliases.as_slice()) else {
            return self.size_list(service, item_cfg, customer);
        };
        let size_cfg = &item_cfg.sizes[size_key];

        match size_cfg.regular_price(service, customer) {
            Some(price) => {
                let mut text = format!("{} {} บริการ{service_name}", item_cfg.name, size_cfg.name);
                if !customer_name.is_empty() {
                    let _ = write!(text, " สำหรับ{customer_name}");
                }
                text.push_str(": ");
                text.push_str(&price.parts("ราคาเต็ม ").join(", "));
                text
            }
            None => format!(
                "ไม่พบข้อมูลราคา{} {} {service_name} สำหรับ{customer_name}",
                item_cfg.name, size_cfg.name
            ),
        }
    }

    /// Every priced size of an item, used when the size is missing or unknown
    fn size_list(&self, service: &str, item: &ItemConfig, customer: &str) -> String {
        let service_name = self.services.get(service).map_or("", |s| s.name.as_str());

        let lines: Vec<String> = item
            .sizes
            .values()
            .filter_map(|size| {
                let price = size.regular_price(service, customer)?;
                Some(format!(
                    "• {} {}: {}",
                    item.name,
                    size.name,
                    price.parts("").join(", ")
                ))
            })
            .collect();

        if lines.is_empty() {
            return format!("ไม่พบข้อมูลราคา{} สำหรับบริการ{service_name}", item.name);
        }

        let mut text = format!("บริการทำความสะอาด{} {service_name}", item.name);
        if customer != DEFAULT_CUSTOMER {
            let customer_name = self.customer_types.get(customer).map_or("", |c| c.name.as_str());
            let _ = write!(text, " สำหรับ{customer_name}");
        }
        text.push_str(":\n");
        for line in lines {
            text.push_str(&line);
            text.push('\n');
        }
        let _ = write!(text, "\nกรุณาระบุขนาด{}เพื่อข้อมูลราคาที่แม่นยำ", item.name);
        text
    }
}

fn fallback(request: &PricingRequest) -> String {
    format!(
        "ขออภัย ไม่พบข้อมูลราคาสำหรับ บริการ: '{}' สินค้า: '{}' ขนาด: '{}'\n\n\
         กรุณาติดต่อเจ้าหน้าที่เพื่อสอบถามราคาเพิ่มเติม หรือระบุรายละเอียดให้ชัดเจนมากขึ้น เช่น:\n\
         • ประเภทบริการ (กำจัดเชื้อโรค หรือ ซักขจัดคราบ)\n\
         • ประเภทสินค้า (ที่นอน/โซฟา/ม่าน/พรม)\n\
         • ขนาด (3ฟุต, 6ฟุต, 2ที่นั่ง, ฯลฯ)\n\
         • ประเภทลูกค้า (ลูกค้าใหม่ หรือ สมาชิก)",
        request.service_type, request.item_type, request.size
    )
}

/// `get_ncs_pricing`
pub struct PricingTool {
    table: Option<Arc<PricingTable>>,
}

impl PricingTool {
    pub fn new(table: Option<Arc<PricingTable>>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl Tool for PricingTool {
    fn name(&self) -> &'static str {
        "get_ncs_pricing"
    }

    fn description(&self) -> &'static str {
        "Look up cleaning and disinfection prices for an item, size, customer type and package."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["service_type", "item_type"],
            "properties": {
                "service_type": { "type": "string", "description": "disinfection or washing" },
                "item_type": { "type": "string", "description": "mattress, sofa, curtain, carpet" },
                "size": { "type": "string" },
                "customer_type": { "type": "string", "description": "new or member; default new" },
                "package_type": { "type": "string", "description": "default regular" },
                "quantity": { "type": "integer", "minimum": 1 }
            }
        })
    }

    async fn run(&self, arguments: &Value) -> ToolOutput {
        let request: PricingRequest = match decode_arguments(arguments) {
            Ok(request) => request,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        let Some(table) = &self.table else {
            return ToolOutput::error(NOT_READY);
        };
        let quote = table.quote(&request);
        tracing::info!(
            service = %request.service_type,
            item = %request.item_type,
            size = %request.size,
            "Pricing lookup"
        );
        ToolOutput::success(quote)
    }
}
