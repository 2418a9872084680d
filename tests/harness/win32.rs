use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use hudlayer::util;
use hudlayer::WindowHandle;
use windows::core::w;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW,
    PostQuitMessage, RegisterClassW, TranslateMessage, CS_HREDRAW, CS_VREDRAW, MSG, PM_REMOVE,
    WINDOW_EX_STYLE, WM_DESTROY, WM_QUIT, WNDCLASSW, WS_OVERLAPPEDWINDOW, WS_VISIBLE,
};

/// A plain top-level window running its own message loop on a separate
/// thread, standing in for the application an overlay is laid over.
pub struct HostHarness {
    child: Option<JoinHandle<()>>,
    done: Arc<AtomicBool>,
    handle: WindowHandle,
}

impl HostHarness {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let child = Some(thread::spawn({
            let done = Arc::clone(&done);

            move || {
                let hinstance = unsafe { GetModuleHandleW(None).unwrap() };
                let wnd_class = WNDCLASSW {
                    style: CS_HREDRAW | CS_VREDRAW,
                    lpfnWndProc: Some(window_proc),
                    hInstance: hinstance.into(),
                    lpszClassName: w!("HudlayerHost"),
                    ..Default::default()
                };
                unsafe { RegisterClassW(&wnd_class) };
                let hwnd = unsafe {
                    CreateWindowExW(
                        WINDOW_EX_STYLE(0),
                        w!("HudlayerHost"),
                        w!("hudlayer host"),
                        WS_OVERLAPPEDWINDOW | WS_VISIBLE,
                        x,
                        y,
                        width,
                        height,
                        None,
                        None,
                        hinstance,
                        None,
                    )
                    .unwrap()
                };
                tx.send(util::window_handle(hwnd).0).unwrap();

                loop {
                    if !handle_message(hwnd) {
                        break;
                    }

                    if done.load(Ordering::SeqCst) {
                        unsafe { DestroyWindow(hwnd).ok() };
                        break;
                    }

                    thread::yield_now();
                }
            }
        }));

        let handle = WindowHandle(rx.recv().unwrap());
        Self { child, done, handle }
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }
}

impl Drop for HostHarness {
    fn drop(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        self.child.take().unwrap().join().unwrap();
    }
}

fn handle_message(window: HWND) -> bool {
    unsafe {
        let mut msg = MSG::default();
        if PeekMessageW(&mut msg, window, 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
            msg.message != WM_QUIT
        } else {
            true
        }
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_DESTROY => {
            PostQuitMessage(0);
        },
        _ => {
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        },
    }
    LRESULT(0)
}
