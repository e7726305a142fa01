use chrono::NaiveDate;

/// Format an amount in won with thousands separators: 1,234,000원
pub fn won(val: u64) -> String {
    let digits = val.to_string();
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();
    format!("{with_commas}원")
}

pub fn month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}
