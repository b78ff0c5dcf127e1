//! Layered Win32 windows backing the overlay presenter
//!
//! Cards are rounded rectangles (colour-keyed corners) painted with GDI on
//! `WM_PAINT`; flashes are a plain fill. Opacity goes through
//! `SetLayeredWindowAttributes`. All windows live on the UI thread, so paint
//! content and click state sit in thread-local maps keyed by window handle.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::mem;
use tracing::{debug, warn};

use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateFontW, CreateSolidBrush, DRAW_TEXT_FORMAT, DT_CALCRECT, DT_LEFT,
    DT_NOPREFIX, DT_SINGLELINE, DT_TOP, DeleteObject, DrawTextW, EndPaint, FONT_CHARSET,
    FONT_CLIP_PRECISION, FONT_OUTPUT_PRECISION, FONT_QUALITY, FillRect, GetDC, GetMonitorInfoW,
    GetStockObject, HDC, HFONT, MONITOR_DEFAULTTOPRIMARY, MONITORINFO, MonitorFromPoint, NULL_PEN,
    PAINTSTRUCT, ReleaseDC, RoundRect, SelectObject, SetBkMode, SetTextColor, TRANSPARENT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, GetClientRect, GetSystemMetrics, LWA_ALPHA,
    LWA_COLORKEY, MA_NOACTIVATE, RegisterClassW, SM_CXSCREEN, SM_CYSCREEN, SW_SHOWNOACTIVATE,
    SetLayeredWindowAttributes, ShowWindow, WM_LBUTTONDOWN, WM_MBUTTONDOWN, WM_MOUSEACTIVATE,
    WM_NCDESTROY, WM_PAINT, WM_RBUTTONDOWN, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE,
    WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};
use windows::core::{PCWSTR, w};

use crate::animation::{Rect, Size};
use crate::error::OverlayError;
use crate::overlay::{OVERLAY_COLOR, OverlayBackend, OverlaySurface, SurfaceContent};

const CLASS_NAME: PCWSTR = w!("TaskbarNotifierOverlay");

/// Painted outside the rounded card, made fully transparent by the colour key
const COLOR_KEY: (u8, u8, u8) = (255, 0, 255);
const TITLE_COLOR: (u8, u8, u8) = (255, 255, 255);
const TEXT_COLOR: (u8, u8, u8) = (170, 170, 170);

const CORNER_RADIUS: i32 = 5;
const PADDING: i32 = 14;
const TITLE_GAP: i32 = 8;
const TITLE_FONT_HEIGHT: i32 = 20;
const TEXT_FONT_HEIGHT: i32 = 17;
const FONT_FACE: PCWSTR = w!("Segoe UI");

thread_local! {
    static CONTENT: RefCell<HashMap<isize, SurfaceContent>> = RefCell::new(HashMap::new());
    static CLICKED: RefCell<HashSet<isize>> = RefCell::new(HashSet::new());
}

fn key(hwnd: HWND) -> isize {
    hwnd.0 as isize
}

fn colorref((r, g, b): (u8, u8, u8)) -> COLORREF {
    COLORREF(u32::from(r) | (u32::from(g) << 8) | (u32::from(b) << 16))
}

fn to_rect(r: RECT) -> Rect {
    Rect {
        left: r.left,
        top: r.top,
        right: r.right,
        bottom: r.bottom,
    }
}

/// Overlay windows on the primary monitor
pub struct Win32OverlayBackend {
    instance: HINSTANCE,
}

impl Win32OverlayBackend {
    /// Register the overlay window class. Call once, on the UI thread.
    pub fn new() -> Result<Self, OverlayError> {
        let instance: HINSTANCE = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|_| OverlayError::ClassRegistration("TaskbarNotifierOverlay"))?
            .into();

        let wc = WNDCLASSW {
            lpfnWndProc: Some(overlay_wnd_proc),
            hInstance: instance,
            lpszClassName: CLASS_NAME,
            ..Default::default()
        };
        if unsafe { RegisterClassW(&wc) } == 0 {
            return Err(OverlayError::ClassRegistration("TaskbarNotifierOverlay"));
        }

        Ok(Self { instance })
    }

    fn monitor_info() -> Option<MONITORINFO> {
        let monitor = unsafe { MonitorFromPoint(POINT { x: 0, y: 0 }, MONITOR_DEFAULTTOPRIMARY) };
        let mut info = MONITORINFO {
            cbSize: mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            Some(info)
        } else {
            warn!("GetMonitorInfoW failed, using screen metrics");
            None
        }
    }

    fn metrics_rect() -> Rect {
        Rect {
            left: 0,
            top: 0,
            right: unsafe { GetSystemMetrics(SM_CXSCREEN) },
            bottom: unsafe { GetSystemMetrics(SM_CYSCREEN) },
        }
    }
}

impl OverlayBackend for Win32OverlayBackend {
    type Surface = Win32Surface;

    fn screen(&self) -> Rect {
        Self::monitor_info()
            .map(|i| to_rect(i.rcMonitor))
            .unwrap_or_else(Self::metrics_rect)
    }

    fn work_area(&self) -> Rect {
        Self::monitor_info()
            .map(|i| to_rect(i.rcWork))
            .unwrap_or_else(Self::metrics_rect)
    }

    fn measure_card(&self, title: &str, text: &str) -> Size {
        unsafe {
            let dc = GetDC(None);
            let fonts = CardFonts::new();

            let old = SelectObject(dc, fonts.title.into());
            let title_rect = calc_text(dc, title, DT_SINGLELINE);
            SelectObject(dc, fonts.text.into());
            let text_rect = calc_text(dc, text, Default::default());
            SelectObject(dc, old);

            let _ = ReleaseDC(None, dc);

            Size {
                width: title_rect.right.max(text_rect.right) + PADDING * 2,
                height: title_rect.bottom + TITLE_GAP + text_rect.bottom + PADDING * 2,
            }
        }
    }

    fn open(
        &mut self,
        bounds: Rect,
        content: SurfaceContent,
    ) -> Result<Win32Surface, OverlayError> {
        let keyed = matches!(content, SurfaceContent::Card { .. });

        let ex = WS_EX_LAYERED | WS_EX_TOOLWINDOW | WS_EX_TOPMOST | WS_EX_NOACTIVATE;
        let hwnd = unsafe {
            CreateWindowExW(
                ex,
                CLASS_NAME,
                PCWSTR::null(),
                WS_POPUP,
                bounds.left,
                bounds.top,
                bounds.width(),
                bounds.height(),
                None,
                None,
                Some(self.instance),
                None,
            )
        }
        .map_err(|e| OverlayError::Create(e.to_string()))?;

        CONTENT.with(|c| c.borrow_mut().insert(key(hwnd), content));

        let mut surface = Win32Surface {
            hwnd: Some(hwnd),
            keyed,
        };
        surface.set_opacity(0.0);
        unsafe {
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
        }
        debug!(hwnd = ?hwnd, ?bounds, "Overlay window created");

        Ok(surface)
    }
}

/// One overlay window; destroyed on close
pub struct Win32Surface {
    hwnd: Option<HWND>,
    keyed: bool,
}

impl OverlaySurface for Win32Surface {
    fn set_opacity(&mut self, opacity: f64) {
        let Some(hwnd) = self.hwnd else {
            return;
        };
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let flags = if self.keyed {
            LWA_ALPHA | LWA_COLORKEY
        } else {
            LWA_ALPHA
        };
        let result = unsafe { SetLayeredWindowAttributes(hwnd, colorref(COLOR_KEY), alpha, flags) };
        if let Err(e) = result {
            debug!("SetLayeredWindowAttributes: {e}");
        }
    }

    fn was_clicked(&self) -> bool {
        self.hwnd
            .is_some_and(|hwnd| CLICKED.with(|c| c.borrow().contains(&key(hwnd))))
    }

    fn close(&mut self) {
        if let Some(hwnd) = self.hwnd.take() {
            if let Err(e) = unsafe { DestroyWindow(hwnd) } {
                warn!(hwnd = ?hwnd, "DestroyWindow: {e}");
            }
        }
    }
}

impl Drop for Win32Surface {
    fn drop(&mut self) {
        self.close();
    }
}

unsafe extern "system" fn overlay_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_PAINT => {
            paint(hwnd);
            LRESULT(0)
        }
        WM_LBUTTONDOWN | WM_RBUTTONDOWN | WM_MBUTTONDOWN => {
            CLICKED.with(|c| c.borrow_mut().insert(key(hwnd)));
            LRESULT(0)
        }
        WM_MOUSEACTIVATE => LRESULT(MA_NOACTIVATE as isize),
        WM_NCDESTROY => {
            CONTENT.with(|c| c.borrow_mut().remove(&key(hwnd)));
            CLICKED.with(|c| c.borrow_mut().remove(&key(hwnd)));
            unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

fn paint(hwnd: HWND) {
    let content = CONTENT.with(|c| c.borrow().get(&key(hwnd)).cloned());

    unsafe {
        let mut ps = PAINTSTRUCT::default();
        let dc = BeginPaint(hwnd, &mut ps);
        let client = ps.rcPaint;

        match content {
            Some(SurfaceContent::Card { title, text }) => paint_card(dc, hwnd, &title, &text),
            Some(SurfaceContent::Flash) => fill(dc, &client, OVERLAY_COLOR),
            None => {}
        }

        let _ = EndPaint(hwnd, &ps);
    }
}

unsafe fn paint_card(dc: HDC, hwnd: HWND, title: &str, text: &str) {
    let mut client = RECT::default();
    unsafe {
        let _ = GetClientRect(hwnd, &mut client);
        fill(dc, &client, COLOR_KEY);

        let brush = CreateSolidBrush(colorref(OVERLAY_COLOR));
        let old_brush = SelectObject(dc, brush.into());
        let old_pen = SelectObject(dc, GetStockObject(NULL_PEN));
        let _ = RoundRect(
            dc,
            client.left,
            client.top,
            client.right + 1,
            client.bottom + 1,
            CORNER_RADIUS * 2,
            CORNER_RADIUS * 2,
        );
        SelectObject(dc, old_pen);
        SelectObject(dc, old_brush);
        let _ = DeleteObject(brush.into());

        let fonts = CardFonts::new();
        let _ = SetBkMode(dc, TRANSPARENT);

        let old_font = SelectObject(dc, fonts.title.into());
        let title_height = calc_text(dc, title, DT_SINGLELINE).bottom;
        let mut title_rect = RECT {
            left: client.left + PADDING,
            top: client.top + PADDING,
            right: client.right - PADDING,
            bottom: client.top + PADDING + title_height,
        };
        let _ = SetTextColor(dc, colorref(TITLE_COLOR));
        draw_text(dc, title, &mut title_rect, DT_SINGLELINE);

        SelectObject(dc, fonts.text.into());
        let mut text_rect = RECT {
            left: client.left + PADDING,
            top: title_rect.bottom + TITLE_GAP,
            right: client.right - PADDING,
            bottom: client.bottom - PADDING,
        };
        let _ = SetTextColor(dc, colorref(TEXT_COLOR));
        draw_text(dc, text, &mut text_rect, Default::default());

        SelectObject(dc, old_font);
    }
}

unsafe fn fill(dc: HDC, rect: &RECT, color: (u8, u8, u8)) {
    unsafe {
        let brush = CreateSolidBrush(colorref(color));
        FillRect(dc, rect, brush);
        let _ = DeleteObject(brush.into());
    }
}

unsafe fn draw_text(dc: HDC, text: &str, rect: &mut RECT, extra: DRAW_TEXT_FORMAT) {
    let mut wide: Vec<u16> = text.encode_utf16().collect();
    unsafe {
        DrawTextW(dc, &mut wide, rect, DT_LEFT | DT_TOP | DT_NOPREFIX | extra);
    }
}

/// Extent of `text` in the selected font (origin at 0,0)
unsafe fn calc_text(dc: HDC, text: &str, extra: DRAW_TEXT_FORMAT) -> RECT {
    let mut rect = RECT::default();
    unsafe { draw_text(dc, text, &mut rect, DT_CALCRECT | extra) };
    rect
}

/// Bold title + regular text fonts, deleted on drop
struct CardFonts {
    title: HFONT,
    text: HFONT,
}

impl CardFonts {
    fn new() -> Self {
        Self {
            title: create_font(TITLE_FONT_HEIGHT, 700),
            text: create_font(TEXT_FONT_HEIGHT, 400),
        }
    }
}

impl Drop for CardFonts {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.title.into());
            let _ = DeleteObject(self.text.into());
        }
    }
}

fn create_font(height: i32, weight: i32) -> HFONT {
    unsafe {
        CreateFontW(
            height,
            0,
            0,
            0,
            weight,
            0,
            0,
            0,
            FONT_CHARSET(0),
            FONT_OUTPUT_PRECISION(0),
            FONT_CLIP_PRECISION(0),
            FONT_QUALITY(0),
            0,
            FONT_FACE,
        )
    }
}
