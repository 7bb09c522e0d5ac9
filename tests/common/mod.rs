use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;

pub const HEADER: &str = "Brand,PackType,PPG,Channel,Market,Year,Month,SalesValue,Volume";

/// Write `body` under a fresh temp dir as `name`; keep the dir alive.
pub fn write_file(name: &str, body: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    (dir, path)
}

/// A small dataset exercising missing brands, missing months and a
/// non-numeric sales cell.
pub fn sales_csv() -> String {
    let rows = [
        "Aurora,Pouch,Small Single,Retail,North,2022,3,120,12",
        "Brisk,Can,Large Multi,Online,South,2022,3,80,20",
        "Aurora,Pouch,Small Single,Retail,South,2023,1,200,18",
        "Brisk,Can,Large Multi,Retail,North,2023,12,220,25",
        ",Bottle,Small Multi,Retail,East,2023,2,50,5",
        "Crestline,Bottle,Small Multi,Online,North,2023,,40,4",
        "Crestline,Bottle,Small Multi,Online,East,2023,7,n/a,6",
    ];
    format!("{HEADER},Notes\n{}\n", rows.map(|r| format!("{r},")).join("\n"))
}
