//! 图片列表处理
//!
//! 同一张照片常以多个尺寸出现（`-cc_ft_384.jpg` / `-cc_ft_1536.jpg`、
//! `mbphoto` / `bigphoto` 目录等）。按照片身份去重，保留分辨率最大的版本，
//! 再按上限截断。顺序以照片第一次出现的位置为准。

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

/// 默认图片上限
pub const DEFAULT_MAX_IMAGES: usize = 20;

/// 以目录名区分尺寸的站点
static SIZE_DIRECTORIES: phf::Map<&'static str, u32> = phf::phf_map! {
    "bigphoto" => 1024,
    "mbphoto" => 600,
    "islphoto" => 400,
    "lgphoto" => 800,
};

fn size_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?P<stem>.+?)(?:-cc_ft_(?P<ft>\d{2,4})|-uncropped_scaled_within_(?P<sw>\d{2,4})_\d{2,4}|-p_[a-z]|_w(?P<w>\d{2,4})|[-_](?P<wx>\d{2,4})x\d{2,4})\.(?:jpe?g|png|webp|avif)$",
        )
        .expect("静态正则表达式")
    })
}

/// 照片身份与尺寸提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoIdentity {
    pub key: String,
    pub size: Option<u32>,
}

/// 计算照片身份：去掉查询参数、尺寸后缀、扩展名和尺寸目录
///
/// 只识别已知站点的尺寸标记；`IMG_1234.jpg` 这类编号是照片本身的一部分。
pub fn photo_identity(url: &str) -> PhotoIdentity {
    let path = url.split(['?', '#']).next().unwrap_or(url);

    let mut size = Url::parse(url).ok().and_then(|u| size_from_query(&u));

    let mut segments: Vec<String> = path.split('/').map(str::to_string).collect();
    for segment in segments.iter_mut() {
        if let Some(dir_size) = SIZE_DIRECTORIES.get(segment.to_ascii_lowercase().as_str()) {
            size = size.max(Some(*dir_size));
            *segment = "*".to_string();
        }
    }

    if let Some(last) = segments.last_mut() {
        if let Some(caps) = size_suffix_regex().captures(last) {
            let suffix_size = ["ft", "sw", "w", "wx"]
                .iter()
                .find_map(|name| caps.name(name))
                .and_then(|m| m.as_str().parse::<u32>().ok());
            size = size.max(suffix_size);
            *last = caps["stem"].to_string();
        } else if let Some((stem, _ext)) = last.rsplit_once('.') {
            *last = stem.to_string();
        }
    }

    PhotoIdentity {
        key: segments.join("/").to_ascii_lowercase(),
        size,
    }
}

fn size_from_query(url: &Url) -> Option<u32> {
    url.query_pairs()
        .filter(|(k, _)| matches!(k.to_ascii_lowercase().as_str(), "w" | "width" | "resizew"))
        .filter_map(|(_, v)| v.parse().ok())
        .max()
}

/// 去重、挑选最大尺寸、截断
///
/// `explicit_width` 为结构化数据里给出的宽度，优先于从 URL 推断的尺寸。
pub fn normalize_images<I>(images: I, max: usize) -> Vec<String>
where
    I: IntoIterator<Item = (String, Option<u32>)>,
{
    let mut ordered: Vec<(String, Option<u32>)> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for (url, explicit_width) in images {
        let url = url.trim().to_string();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            continue;
        }

        let identity = photo_identity(&url);
        let size = explicit_width.or(identity.size);

        match index_by_key.get(&identity.key) {
            Some(&idx) => {
                let current = ordered[idx].1;
                if size.unwrap_or(0) > current.unwrap_or(0) {
                    ordered[idx] = (url, size);
                }
            }
            None => {
                index_by_key.insert(identity.key, ordered.len());
                ordered.push((url, size));
            }
        }
    }

    ordered.into_iter().take(max).map(|(url, _)| url).collect()
}

/// 没有尺寸信息的 URL 列表
pub fn normalize_urls<I, S>(urls: I, max: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    normalize_images(urls.into_iter().map(|u| (u.into(), None)), max)
}
