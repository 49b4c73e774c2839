//! Generated transaction CSVs

use qfraud_api::models::transaction::required_columns;
use qfraud_api::models::FEATURE_COUNT;

/// `Time,V1,...,V28,Amount,Class`
pub fn header_line() -> String {
    required_columns().collect::<Vec<_>>().join(",")
}

/// Two well separated clusters: the first `fraud` of `total` rows are class 1
pub fn separable_csv(total: usize, fraud: usize) -> String {
    let mut lines = vec![header_line()];
    for i in 0..total {
        let class = usize::from(i < fraud);
        let center = if class == 1 { 2.0 } else { -2.0 };
        let mut fields: Vec<String> = (0..FEATURE_COUNT)
            .map(|j| {
                let jitter = ((i * 31 + j * 17) % 13) as f64 / 13.0 - 0.5;
                format!("{:.4}", center + jitter)
            })
            .collect();
        fields.push(class.to_string());
        lines.push(fields.join(","));
    }
    lines.join("\n") + "\n"
}
