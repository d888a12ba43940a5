fn main() {
    // no-console: 在 windows 上作为后台程序运行，不弹出控制台窗口
    println!("cargo::rustc-check-cfg=cfg(windows_subsystem)");
    if std::env::var_os("CARGO_FEATURE_NO_CONSOLE").is_some() {
        println!("cargo::rustc-cfg=windows_subsystem");
    }
}
