use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::info;

use super::IngestError;
use super::records::{BulkRecord, Customer, Item, Order, Sex};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const PREFECTURES: [&str; 47] = [
    "東京都", "神奈川県", "埼玉県", "千葉県", "大阪府", "京都府", "兵庫県",
    "愛知県", "福岡県", "北海道", "宮城県", "広島県", "新潟県", "静岡県",
    "長野県", "福島県", "茨城県", "群馬県", "栃木県", "岐阜県", "三重県",
    "滋賀県", "奈良県", "和歌山県", "岡山県", "山口県", "徳島県", "香川県",
    "愛媛県", "高知県", "佐賀県", "長崎県", "熊本県", "大分県", "宮崎県",
    "鹿児島県", "沖縄県", "青森県", "岩手県", "秋田県", "山形県", "富山県",
    "石川県", "福井県", "山梨県", "鳥取県", "島根県",
];

/// Italian restaurant menu; only used to pick a plausible price per item.
pub const MENU_ITEMS: [&str; 20] = [
    "マルゲリータピザ",
    "カルボナーラ",
    "アマトリチャーナ",
    "ペンネ・アラビアータ",
    "ミラノ風カツレツ",
    "ロブスターリゾット",
    "トリュフパスタ",
    "マリナーラピザ",
    "ラザニア",
    "オッソブーコ",
    "ティラミス",
    "カプレーゼ",
    "カルパッチョ",
    "アランチーニ",
    "ミネストローネ",
    "カチョ・エ・ペペ",
    "ナポリタン",
    "シーフードパエリア",
    "バーニャ・カウダ",
    "ポレンタ",
];

const HOME_PREFECTURE: &str = "東京都";
const HOME_SHARE: f64 = 0.9;
const HISTORY_DAYS: i64 = 365;
const OPENING_HOUR: i64 = 10;
const CLOSING_HOUR: i64 = 22;
const QUANTITIES: [i32; 3] = [1, 2, 3];
const QUANTITY_WEIGHTS: [u32; 3] = [70, 25, 5];

#[derive(Debug, Clone, Copy)]
pub struct SampleSizes {
    pub customers: usize,
    pub items: usize,
    pub orders: usize,
}

impl Default for SampleSizes {
    fn default() -> Self {
        Self {
            customers: 100,
            items: 20,
            orders: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleDataset {
    pub customers: Vec<Customer>,
    pub items: Vec<Item>,
    pub orders: Vec<Order>,
}

pub struct SampleGenerator {
    rng: StdRng,
    reference: NaiveDateTime,
}

impl SampleGenerator {
    /// `reference` is "now": orders fall within the year before it.
    pub fn new(seed: Option<u64>, reference: NaiveDateTime) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, reference }
    }

    pub fn generate(&mut self, sizes: SampleSizes) -> SampleDataset {
        // Items first: order totals depend on item prices.
        let items = self.items(sizes.items);
        let customers = self.customers(sizes.customers);
        let orders = self.orders(sizes.orders, customers.len(), &items);
        SampleDataset {
            customers,
            items,
            orders,
        }
    }

    pub fn customers(&mut self, count: usize) -> Vec<Customer> {
        (1..=count)
            .map(|id| {
                let live = if self.rng.gen_bool(HOME_SHARE) {
                    HOME_PREFECTURE
                } else {
                    PREFECTURES[1..]
                        .choose(&mut self.rng)
                        .copied()
                        .unwrap_or(HOME_PREFECTURE)
                };
                Customer {
                    customer_id: id as i32,
                    age: self.rng.gen_range(20..=60),
                    sex: if self.rng.gen_bool(0.5) { Sex::Man } else { Sex::Woman },
                    live: live.to_string(),
                }
            })
            .collect()
    }

    pub fn items(&mut self, count: usize) -> Vec<Item> {
        MENU_ITEMS
            .iter()
            .cycle()
            .take(count)
            .enumerate()
            .map(|(idx, menu_name)| Item {
                item_id: idx as i32 + 1,
                price: self.price_for(menu_name),
            })
            .collect()
    }

    fn price_for(&mut self, menu_name: &str) -> i32 {
        let has = |words: &[&str]| words.iter().any(|w| menu_name.contains(w));
        let range = if has(&["ピザ"]) {
            1200..=2500
        } else if has(&["パスタ", "リゾット", "ラザニア"]) {
            1400..=2800
        } else if has(&["ステーキ", "カツレツ", "オッソブーコ"]) {
            2000..=3500
        } else if has(&["ティラミス"]) {
            600..=1000
        } else if has(&["サラダ", "カルパッチョ", "カプレーゼ"]) {
            800..=1500
        } else if has(&["パエリア"]) {
            1800..=3200
        } else {
            1000..=2500
        };
        self.rng.gen_range(range)
    }

    pub fn orders(&mut self, count: usize, customer_count: usize, items: &[Item]) -> Vec<Order> {
        if customer_count == 0 || items.is_empty() {
            return Vec::new();
        }

        let start = (self.reference - Duration::days(HISTORY_DAYS))
            .date()
            .and_time(NaiveTime::MIN);
        let quantity_dist = match WeightedIndex::new(QUANTITY_WEIGHTS) {
            Ok(dist) => dist,
            Err(_) => return Vec::new(),
        };

        (1..=count)
            .map(|id| {
                let customer_id = self.rng.gen_range(1..=customer_count) as i32;
                let item = &items[self.rng.gen_range(0..items.len())];
                let order_time = start
                    + Duration::days(self.rng.gen_range(0..=HISTORY_DAYS))
                    + Duration::hours(self.rng.gen_range(OPENING_HOUR..=CLOSING_HOUR))
                    + Duration::minutes(self.rng.gen_range(0..=59));
                let quantity = QUANTITIES[quantity_dist.sample(&mut self.rng)];

                Order {
                    order_id: id as i32,
                    customer_id,
                    order_time,
                    total_price: item.price * quantity,
                    item_id: item.item_id,
                }
            })
            .collect()
    }
}

/// Writes `rows` as UTF-8 CSV with a byte-order mark and a header line.
pub fn write_csv<T: BulkRecord + Serialize>(path: &Path, rows: &[T]) -> Result<(), IngestError> {
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(T::TABLE.column_names())
        .map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush()?;

    info!("Wrote {} ({} records)", path.display(), rows.len());
    Ok(())
}

pub fn write_dataset(dir: &Path, dataset: &SampleDataset) -> Result<(), IngestError> {
    std::fs::create_dir_all(dir)?;
    write_csv(&dir.join(super::CUSTOMERS_FILE), &dataset.customers)?;
    write_csv(&dir.join(super::ITEMS_FILE), &dataset.items)?;
    write_csv(&dir.join(super::ORDERS_FILE), &dataset.orders)?;
    Ok(())
}
