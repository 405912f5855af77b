use bardraw::render::backends::cairo::CairoWindowSystem;
use bardraw::render::backends::parley::ParleyShaper;
use bardraw::{Connection, CursorShape, DrawSurface, Drawable, DrwConfig};
use std::path::PathBuf;
use std::rc::Rc;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // An optional JSON config path as first argument; dwm's colors otherwise
    let cfg = match std::env::args().nth(1) {
        Some(path) => DrwConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => DrwConfig::default(),
    };

    let ws = Rc::new(CairoWindowSystem::new());
    let conn = Connection::new(ws.clone(), Rc::new(ParleyShaper::new()), 0);

    let fonts = cfg.load_fonts(&conn);
    if fonts.is_empty() {
        anyhow::bail!("no fonts could be loaded from {:?}", cfg.fonts);
    }
    let schemes = cfg.load_schemes(&conn)?;
    let lpad = cfg.lpad(&fonts);
    let bar_h = fonts.head().map(|f| f.height()).unwrap_or(0) + 2;
    let bar_w = 640;

    let win = ws.add_window(bar_w, bar_h)?;
    let mut drw = DrawSurface::new(&conn, win, bar_w, bar_h)?;
    drw.set_fontset(Some(Rc::new(fonts)));

    let mut schemes = schemes.into_iter().map(|(name, s)| (name, Rc::new(s)));
    let (_, norm) = schemes.next().ok_or_else(|| anyhow::anyhow!("no color schemes"))?;
    let sel = schemes.next().map(|(_, s)| s).unwrap_or_else(|| norm.clone());

    // Tags on the left, the selected one highlighted
    let mut x = 0;
    for (i, tag) in ["1", "2", "3", "4", "5"].iter().enumerate() {
        let w = drw.fontset_width(tag) + lpad;
        drw.set_scheme(Some(if i == 0 { sel.clone() } else { norm.clone() }));
        x = drw.text(x, 0, w, bar_h, lpad / 2, tag, false);
        if i == 0 {
            drw.rect(x - w as i32 + 1, 1, 4, 4, true, false);
        }
    }

    // Status text on the right
    let status = "bardraw demo";
    let sw = drw.fontset_width(status) + lpad;
    drw.set_scheme(Some(norm.clone()));
    let title_w = (bar_w as i32 - sw as i32 - x).max(0) as u32;
    drw.text(x, 0, title_w, bar_h, lpad / 2, "untitled", false);
    drw.text(bar_w as i32 - sw as i32, 0, sw, bar_h, lpad / 2, status, false);

    let _cursor = drw.create_cursor(CursorShape::LEFT_PTR);
    drw.map(win, 0, 0, bar_w, bar_h);

    let out = PathBuf::from("status_bar.png");
    ws.snapshot(Drawable::Window(win))?.write_png(&out)?;
    log::info!("wrote {}", out.display());

    Ok(())
}
